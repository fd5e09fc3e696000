//! pve-client - a Proxmox VE cluster API client with interchangeable
//! transports
//!
//! This library talks to a Proxmox VE control plane through one of three
//! transports - direct HTTPS, the local `pvesh` command-line tool, or
//! `pvesh` executed over SSH - behind a single request/response contract.
//! On top of the transports sit a fluent path builder, dotted-key response
//! projection, and a task-completion poller for long-running operations.

// Deny all clippy warnings in this crate
#![deny(
    clippy::all,
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backends;
pub mod client;
pub mod config;
pub mod error;
pub mod projection;
pub mod registry;
pub mod request;
pub mod response;
pub mod task;

pub use client::{AsyncPveClient, Client, PveClient, new_client};
pub use config::ClientConfig;
pub use error::Error;
pub use projection::FilterSpec;
pub use registry::Mode;
pub use request::{Method, Request};
pub use response::ApiResponse;
pub use task::Upid;
