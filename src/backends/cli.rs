//! Local command-line transport
//!
//! Formats every request as a `pvesh` invocation and runs it as a
//! subprocess. Success is exit code 0; stdout is decoded as JSON when
//! possible and carried as raw text otherwise; stderr becomes the
//! diagnostic on failure.

use std::process::Output;

use async_trait::async_trait;

use crate::backends::{AsyncBackend, Backend, format_command};
use crate::config::CliConfig;
use crate::error::Error;
use crate::request::Request;
use crate::response::ApiResponse;

const BACKEND_NAME: &str = "cli";

/// Classify a finished subprocess into the normalized envelope
fn classify(output: &Output) -> ApiResponse {
    let status_code = i64::from(output.status.code().unwrap_or(-1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() {
        ApiResponse::success(status_code, ApiResponse::decode_output(&stdout))
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostic = stderr.trim();
        let diagnostic = if diagnostic.is_empty() {
            format!("command exited with status {status_code}")
        } else {
            diagnostic.to_string()
        };
        ApiResponse::failure(status_code, diagnostic)
    }
}

/// Blocking command-line backend
#[derive(Debug)]
pub struct CliBackend {
    entry_point: String,
    connected: bool,
}

impl CliBackend {
    /// Build a backend from the CLI section of the configuration
    #[must_use]
    pub fn new(config: &CliConfig) -> Self {
        Self {
            entry_point: config.entry_point.clone(),
            connected: false,
        }
    }

    fn execute(&self, request: &Request) -> ApiResponse {
        let command = match format_command(&self.entry_point, request) {
            Ok(command) => command,
            Err(e) => return ApiResponse::unavailable(e.to_string()),
        };
        log::debug!("running command: {}", command.join(" "));
        let output = std::process::Command::new(&command[0])
            .args(&command[1..])
            .output();
        match output {
            Ok(output) => classify(&output),
            Err(e) => ApiResponse::unavailable(format!("failed to spawn {}: {e}", command[0])),
        }
    }
}

impl Backend for CliBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn connect(&mut self) -> Result<(), Error> {
        // Nothing to hold open for a subprocess; the flag only tracks the
        // scoped-session lifecycle so unscoped use can be warned about.
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn request(&mut self, request: &Request) -> ApiResponse {
        if !self.connected {
            log::warn!("CLI backend used outside a session; running one-shot");
        }
        self.execute(request)
    }
}

/// Non-blocking command-line backend
#[derive(Debug)]
pub struct AsyncCliBackend {
    entry_point: String,
    connected: bool,
}

impl AsyncCliBackend {
    /// Build a backend from the CLI section of the configuration
    #[must_use]
    pub fn new(config: &CliConfig) -> Self {
        Self {
            entry_point: config.entry_point.clone(),
            connected: false,
        }
    }

    async fn execute(&self, request: &Request) -> ApiResponse {
        let command = match format_command(&self.entry_point, request) {
            Ok(command) => command,
            Err(e) => return ApiResponse::unavailable(e.to_string()),
        };
        log::debug!("running command: {}", command.join(" "));
        let output = tokio::process::Command::new(&command[0])
            .args(&command[1..])
            .output()
            .await;
        match output {
            Ok(output) => classify(&output),
            Err(e) => ApiResponse::unavailable(format!("failed to spawn {}: {e}", command[0])),
        }
    }
}

#[async_trait]
impl AsyncBackend for AsyncCliBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn connect(&mut self) -> Result<(), Error> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }

    async fn request(&mut self, request: &Request) -> ApiResponse {
        if !self.connected {
            log::warn!("CLI backend used outside a session; running one-shot");
        }
        self.execute(request).await
    }
}
