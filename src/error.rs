//! Error types for client construction and request building
//!
//! Only configuration errors surface as [`Error`] values: unknown backends,
//! unsupported verbs, malformed task handles, bad config files. Transport
//! failures never become errors - they are converted into a failed
//! [`crate::ApiResponse`] at the backend boundary so callers see one uniform
//! result shape regardless of which transport misbehaved.

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::Mode;

/// Errors raised eagerly at setup or request-build time
#[derive(Debug, Error)]
pub enum Error {
    /// No backend is registered under the requested name and mode
    #[error("unknown backend: {name:?} ({mode})")]
    UnknownBackend {
        /// Requested transport name
        name: String,
        /// Requested concurrency mode
        mode: Mode,
    },

    /// Concurrency mode is not `sync` or `async`
    #[error("unknown concurrency mode: {0:?}")]
    UnknownMode(String),

    /// Terminal verb is not one of get/post/put/delete or their aliases
    #[error("unsupported verb: {0:?}")]
    UnsupportedVerb(String),

    /// Task handle does not have the UPID tag or the nine expected fields
    #[error("malformed UPID: {0:?}")]
    MalformedUpid(String),

    /// Endpoint contains a placeholder with no matching path parameter
    #[error("missing path parameter: {{{0}}}")]
    MissingPathParam(String),

    /// A required connection parameter is absent from the configuration
    #[error("missing configuration value: {0}")]
    MissingConfig(&'static str),

    /// Config file could not be read
    #[error("cannot read config file {}: {source}", path.display())]
    ConfigRead {
        /// Path that was attempted
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Config file could not be parsed as TOML
    #[error("cannot parse config file {}: {source}", path.display())]
    ConfigParse {
        /// Path that was attempted
        path: PathBuf,
        /// Underlying TOML error
        source: toml::de::Error,
    },

    /// Explicit connection establishment failed
    #[error("connect failed: {0}")]
    Connect(String),
}
