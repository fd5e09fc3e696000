//! Transport backends
//!
//! A backend is one concrete way of reaching the control plane. Each owns
//! exactly one logical connection per constructed instance; fan-out
//! concurrency is achieved by constructing more instances, not by sharing
//! one connection across overlapping in-flight requests.
//!
//! The contract is deliberately narrow: a lifecycle (`connect` /
//! `disconnect`) and a `request` that always returns an [`ApiResponse`].
//! Transport-native faults - connection refused, non-zero exit, malformed
//! output - are caught here and converted into failed envelopes; callers
//! never see transport-native error types.

pub mod cli;
pub mod https;
pub mod ssh;

use async_trait::async_trait;

use crate::error::Error;
use crate::registry::Mode;
use crate::request::Request;
use crate::response::ApiResponse;

pub use cli::{AsyncCliBackend, CliBackend};
pub use https::{AsyncHttpsBackend, HttpsBackend};
pub use ssh::{AsyncSshBackend, SshBackend};

/// Blocking transport backend
pub trait Backend: Send {
    /// Registry name this backend was registered under
    fn name(&self) -> &'static str;

    /// Acquire the underlying connection
    fn connect(&mut self) -> Result<(), Error>;

    /// Release the underlying connection; safe to call when not connected
    fn disconnect(&mut self);

    /// Execute one request, returning the normalized envelope.
    ///
    /// Calling this without a prior [`Backend::connect`] creates an ad-hoc
    /// one-shot connection around the single call and logs a warning.
    fn request(&mut self, request: &Request) -> ApiResponse;
}

/// Non-blocking transport backend
#[async_trait]
pub trait AsyncBackend: Send {
    /// Registry name this backend was registered under
    fn name(&self) -> &'static str;

    /// Acquire the underlying connection
    async fn connect(&mut self) -> Result<(), Error>;

    /// Release the underlying connection; safe to call when not connected
    async fn disconnect(&mut self);

    /// Execute one request, returning the normalized envelope.
    ///
    /// Calling this without a prior [`AsyncBackend::connect`] creates an
    /// ad-hoc one-shot connection around the single call and logs a warning.
    async fn request(&mut self, request: &Request) -> ApiResponse;
}

/// A constructed backend of either concurrency mode
pub enum BackendHandle {
    /// Blocking backend
    Sync(Box<dyn Backend>),
    /// Non-blocking backend
    Async(Box<dyn AsyncBackend>),
}

impl BackendHandle {
    /// Registry name of the contained backend
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sync(backend) => backend.name(),
            Self::Async(backend) => backend.name(),
        }
    }

    /// Concurrency mode of the contained backend
    #[must_use]
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Sync(_) => Mode::Sync,
            Self::Async(_) => Mode::Async,
        }
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("name", &self.name())
            .field("mode", &self.mode())
            .finish()
    }
}

/// Format the `pvesh` invocation for a request, shared by the CLI and SSH
/// transports: `<entry_point> <verb> <endpoint> --<key> <value>...
/// --output-format json`. The `post`/`put` methods are remapped to the
/// tool's `create`/`set` verbs.
pub fn format_command(entry_point: &str, request: &Request) -> Result<Vec<String>, Error> {
    let endpoint = request.resolved_endpoint()?;
    let mut command = vec![
        entry_point.to_string(),
        request.method.cli_verb().to_string(),
        format!("/{endpoint}"),
    ];
    for (key, value) in request.cli_parameters() {
        command.push(format!("--{key}"));
        command.push(value);
    }
    command.push("--output-format".to_string());
    command.push("json".to_string());
    Ok(command)
}
