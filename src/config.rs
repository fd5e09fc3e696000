//! Client configuration
//!
//! Connection parameters for all three transports live in one flat
//! [`ClientConfig`] value, usually loaded from a TOML file. The library
//! never reads configuration implicitly; callers construct or load a config
//! and hand it to the client factory.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// HTTPS transport parameters
    #[serde(default)]
    pub api: ApiConfig,
    /// Local CLI transport parameters
    #[serde(default)]
    pub cli: CliConfig,
    /// SSH transport parameters
    #[serde(default)]
    pub ssh: SshConfig,
    /// Task poller timeout, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Task poller fixed interval, in seconds
    #[serde(default = "default_polling_interval_secs")]
    pub polling_interval_secs: u64,
}

/// HTTPS transport parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the control plane, e.g. `https://pve.local:8006`
    #[serde(default)]
    pub base_url: String,
    /// API entry point appended to the base URL
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// API token id, e.g. `root@pam!tokenname`
    #[serde(default)]
    pub token_id: String,
    /// API token secret
    #[serde(default)]
    pub token_secret: String,
    /// Verify the TLS certificate of the control plane
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
}

/// Local CLI transport parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Command invoked for every request
    #[serde(default = "default_cli_entry_point")]
    pub entry_point: String,
}

/// SSH transport parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    /// Remote host name or address
    #[serde(default)]
    pub hostname: String,
    /// Remote SSH port
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    /// Remote user
    #[serde(default)]
    pub username: String,
    /// Password authentication, if set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Private key file authentication, if set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
    /// Use the running SSH agent for authentication
    #[serde(default)]
    pub agent: bool,
    /// Accept an unknown host key on first connect, logging its identity.
    /// Off by default; a disabled host-key check is never the default.
    #[serde(default)]
    pub accept_host_key: bool,
}

fn default_entry_point() -> String {
    "api2/json".to_string()
}

fn default_cli_entry_point() -> String {
    "pvesh".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_polling_interval_secs() -> u64 {
    2
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            cli: CliConfig::default(),
            ssh: SshConfig::default(),
            timeout_secs: default_timeout_secs(),
            polling_interval_secs: default_polling_interval_secs(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            entry_point: default_entry_point(),
            token_id: String::new(),
            token_secret: String::new(),
            verify_ssl: true,
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            entry_point: default_cli_entry_point(),
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: default_ssh_port(),
            username: String::new(),
            password: None,
            key_file: None,
            agent: false,
            accept_host_key: false,
        }
    }
}

impl ApiConfig {
    /// Assemble the API token from its id and secret parts
    #[must_use]
    pub fn token(&self) -> String {
        format!("{}={}", self.token_id, self.token_secret)
    }
}

impl ClientConfig {
    /// Load a configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Task poller timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Task poller fixed interval
    #[must_use]
    pub const fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }
}
