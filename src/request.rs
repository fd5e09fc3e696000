//! Request descriptor built by the fluent builder and consumed by backends

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// HTTP-style method of a request.
///
/// The builder also accepts the `pvesh` verb aliases `create` (-> `Post`)
/// and `set` (-> `Put`); anything else is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Read a resource
    #[default]
    Get,
    /// Create a resource
    Post,
    /// Update a resource
    Put,
    /// Delete a resource
    Delete,
}

impl Method {
    /// Parse a terminal verb, accepting the CLI aliases
    pub fn parse(verb: &str) -> Result<Self, Error> {
        match verb.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" | "create" => Ok(Self::Post),
            "put" | "set" => Ok(Self::Put),
            "delete" => Ok(Self::Delete),
            _ => Err(Error::UnsupportedVerb(verb.to_string())),
        }
    }

    /// Lowercase HTTP method name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }

    /// Verb understood by the `pvesh` command-line tool
    #[must_use]
    pub const fn cli_verb(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "create",
            Self::Put => "set",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully-described API request, independent of transport.
///
/// `endpoint` may contain `{placeholder}` tokens that are resolved from
/// `path_params` before dispatch. Query parameters and the body become URL
/// parameters for the HTTPS transport and `--key value` flags for the CLI
/// and SSH transports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Request {
    /// Request method
    pub method: Method,
    /// Slash-joined endpoint path, possibly with `{placeholder}` tokens
    pub endpoint: String,
    /// Values substituted into endpoint placeholders
    #[serde(default)]
    pub path_params: BTreeMap<String, String>,
    /// Extra query parameters
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    /// Request body
    pub body: Option<Value>,
}

impl Request {
    /// Create a request with just a method and endpoint
    #[must_use]
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Resolve `{placeholder}` tokens in the endpoint from `path_params`.
    ///
    /// An unmatched placeholder is a configuration error, raised before any
    /// transport I/O happens.
    pub fn resolved_endpoint(&self) -> Result<String, Error> {
        let endpoint = self.endpoint.trim_matches('/');
        if !endpoint.contains('{') {
            return Ok(endpoint.to_string());
        }
        let mut resolved = endpoint.to_string();
        for (key, value) in &self.path_params {
            resolved = resolved.replace(&format!("{{{key}}}"), value);
        }
        if let Some(start) = resolved.find('{') {
            let rest = &resolved[start + 1..];
            let name = rest.split('}').next().unwrap_or(rest);
            return Err(Error::MissingPathParam(name.to_string()));
        }
        Ok(resolved)
    }

    /// Flags passed to the CLI transports: query parameters first, then the
    /// body fields, both in key order. JSON strings are flattened to their
    /// bare contents; other values keep their JSON rendering.
    #[must_use]
    pub fn cli_parameters(&self) -> Vec<(String, String)> {
        let mut flags: Vec<(String, String)> = self
            .query_params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(Value::Object(map)) = &self.body {
            for (key, value) in map {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                flags.push((key.clone(), rendered));
            }
        }
        flags
    }
}
