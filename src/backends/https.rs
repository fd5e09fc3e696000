//! Direct HTTPS transport
//!
//! Talks to the control plane's REST API with an API token. Success is any
//! status below 400. The API wraps payloads as `{"data": ...}`; that
//! wrapper is stripped here so [`ApiResponse::data`] means the same thing
//! for every transport.

use async_trait::async_trait;
use serde_json::Value;

use crate::backends::{AsyncBackend, Backend};
use crate::config::ApiConfig;
use crate::error::Error;
use crate::request::Request;
use crate::response::ApiResponse;

const BACKEND_NAME: &str = "https";

/// Shared request-independent pieces of both HTTPS backends
#[derive(Debug, Clone)]
struct HttpsParams {
    base_url: String,
    entry_point: String,
    token: String,
    verify_ssl: bool,
}

impl HttpsParams {
    fn new(config: &ApiConfig) -> Result<Self, Error> {
        if config.base_url.is_empty() {
            return Err(Error::MissingConfig("api.base_url"));
        }
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            entry_point: config.entry_point.trim_matches('/').to_string(),
            token: config.token(),
            verify_ssl: config.verify_ssl,
        })
    }

    fn authorization(&self) -> String {
        format!("PVEAPIToken={}", self.token)
    }

    fn format_url(&self, request: &Request) -> Result<String, Error> {
        let endpoint = request.resolved_endpoint()?;
        Ok(format!(
            "{}/{}/{}",
            self.base_url, self.entry_point, endpoint
        ))
    }
}

/// Classify an HTTP exchange into the normalized envelope.
///
/// The `{"data": ...}` wrapper is unwrapped when present; a body that is
/// not valid JSON is carried as raw text, not treated as a decode error.
fn classify(status: u16, body: &str) -> ApiResponse {
    let status_code = i64::from(status);
    let data = match ApiResponse::decode_output(body) {
        Some(Value::Object(mut map)) if map.contains_key("data") => {
            let inner = map.remove("data").unwrap_or(Value::Null);
            if inner.is_null() { None } else { Some(inner) }
        }
        other => other,
    };
    if status < 400 {
        ApiResponse::success(status_code, data)
    } else {
        let error = body.trim();
        let error = if error.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {error}")
        };
        ApiResponse::failure(status_code, error)
    }
}

/// Blocking HTTPS backend
#[derive(Debug)]
pub struct HttpsBackend {
    params: HttpsParams,
    client: Option<reqwest::blocking::Client>,
}

impl HttpsBackend {
    /// Build a backend from the HTTPS section of the configuration
    pub fn new(config: &ApiConfig) -> Result<Self, Error> {
        Ok(Self {
            params: HttpsParams::new(config)?,
            client: None,
        })
    }

    fn build_client(&self) -> Result<reqwest::blocking::Client, Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = reqwest::header::HeaderValue::from_str(&self.params.authorization())
            .map_err(|e| Error::Connect(format!("invalid API token: {e}")))?;
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        reqwest::blocking::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!self.params.verify_ssl)
            .build()
            .map_err(|e| Error::Connect(e.to_string()))
    }

    fn dispatch(&self, request: &Request) -> ApiResponse {
        let client = match &self.client {
            Some(client) => client,
            None => return ApiResponse::unavailable("HTTP client not connected"),
        };
        let url = match self.params.format_url(request) {
            Ok(url) => url,
            Err(e) => return ApiResponse::unavailable(e.to_string()),
        };
        let method = match reqwest::Method::from_bytes(
            request.method.as_str().to_ascii_uppercase().as_bytes(),
        ) {
            Ok(method) => method,
            Err(e) => return ApiResponse::unavailable(e.to_string()),
        };
        let mut builder = client.request(method, &url).query(&request.query_params);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        match builder.send() {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().unwrap_or_default();
                classify(status, &body)
            }
            Err(e) => ApiResponse::unavailable(format!("HTTP request failed: {e}")),
        }
    }
}

impl Backend for HttpsBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn connect(&mut self) -> Result<(), Error> {
        self.client = Some(self.build_client()?);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.client = None;
    }

    fn request(&mut self, request: &Request) -> ApiResponse {
        let one_shot = self.client.is_none();
        if one_shot {
            log::warn!("HTTP client not connected; creating a one-shot connection");
            if let Err(e) = self.connect() {
                return ApiResponse::unavailable(e.to_string());
            }
        }
        let response = self.dispatch(request);
        if one_shot {
            self.disconnect();
        }
        response
    }
}

/// Non-blocking HTTPS backend
#[derive(Debug)]
pub struct AsyncHttpsBackend {
    params: HttpsParams,
    client: Option<reqwest::Client>,
}

impl AsyncHttpsBackend {
    /// Build a backend from the HTTPS section of the configuration
    pub fn new(config: &ApiConfig) -> Result<Self, Error> {
        Ok(Self {
            params: HttpsParams::new(config)?,
            client: None,
        })
    }

    fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = reqwest::header::HeaderValue::from_str(&self.params.authorization())
            .map_err(|e| Error::Connect(format!("invalid API token: {e}")))?;
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!self.params.verify_ssl)
            .build()
            .map_err(|e| Error::Connect(e.to_string()))
    }

    async fn dispatch(&self, request: &Request) -> ApiResponse {
        let client = match &self.client {
            Some(client) => client,
            None => return ApiResponse::unavailable("HTTP client not connected"),
        };
        let url = match self.params.format_url(request) {
            Ok(url) => url,
            Err(e) => return ApiResponse::unavailable(e.to_string()),
        };
        let method = match reqwest::Method::from_bytes(
            request.method.as_str().to_ascii_uppercase().as_bytes(),
        ) {
            Ok(method) => method,
            Err(e) => return ApiResponse::unavailable(e.to_string()),
        };
        let mut builder = client.request(method, &url).query(&request.query_params);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        match builder.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                classify(status, &body)
            }
            Err(e) => ApiResponse::unavailable(format!("HTTP request failed: {e}")),
        }
    }
}

#[async_trait]
impl AsyncBackend for AsyncHttpsBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn connect(&mut self) -> Result<(), Error> {
        self.client = Some(self.build_client()?);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.client = None;
    }

    async fn request(&mut self, request: &Request) -> ApiResponse {
        let one_shot = self.client.is_none();
        if one_shot {
            log::warn!("HTTP client not connected; creating a one-shot connection");
            if let Err(e) = self.connect().await {
                return ApiResponse::unavailable(e.to_string());
            }
        }
        let response = self.dispatch(request).await;
        if one_shot {
            self.disconnect().await;
        }
        response
    }
}
