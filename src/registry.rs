//! Process-wide backend registry
//!
//! Maps `(transport name, concurrency mode)` to a backend factory. The
//! registry is explicit process-wide state: populated once at startup
//! (usually via [`register_defaults`]), read by the client factory on every
//! construction. Re-registration silently overwrites - last writer wins.
//!
//! [`resolve`] returns an absent result for unknown keys rather than
//! failing; producing a clear configuration error is the caller's job
//! (see [`crate::client::new_client`]).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{LazyLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::backends::{
    AsyncCliBackend, AsyncHttpsBackend, AsyncSshBackend, BackendHandle, CliBackend, HttpsBackend,
    SshBackend,
};
use crate::config::ClientConfig;
use crate::error::Error;

/// Concurrency mode of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Blocking, one call per thread
    Sync,
    /// Cooperative, many calls per event loop
    Async,
}

impl Mode {
    /// Lowercase mode name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            other => Err(Error::UnknownMode(other.to_string())),
        }
    }
}

/// Constructor for one registered backend
pub type BackendFactory = fn(&ClientConfig) -> Result<BackendHandle, Error>;

static REGISTRY: LazyLock<RwLock<HashMap<(String, Mode), BackendFactory>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register a backend factory; silently overwrites an existing entry
pub fn register(name: &str, mode: Mode, factory: BackendFactory) {
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    registry.insert((name.to_ascii_lowercase(), mode), factory);
}

/// Remove a registered backend; unknown keys are ignored
pub fn unregister(name: &str, mode: Mode) {
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    registry.remove(&(name.to_ascii_lowercase(), mode));
}

/// Look up a registered factory; `None` for unknown keys
#[must_use]
pub fn resolve(name: &str, mode: Mode) -> Option<BackendFactory> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    registry.get(&(name.to_ascii_lowercase(), mode)).copied()
}

/// Names with at least one registered mode
#[must_use]
pub fn names() -> Vec<String> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<String> = registry.keys().map(|(name, _)| name.clone()).collect();
    names.sort();
    names.dedup();
    names
}

/// Modes with at least one registered name
#[must_use]
pub fn modes() -> Vec<Mode> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    let mut modes: Vec<Mode> = registry.keys().map(|(_, mode)| *mode).collect();
    modes.sort_by_key(|mode| mode.as_str());
    modes.dedup();
    modes
}

/// Recover the `(name, mode)` a constructed backend was registered under,
/// or `None` if that key has since been unregistered
#[must_use]
pub fn reverse_lookup(handle: &BackendHandle) -> Option<(String, Mode)> {
    let key = (handle.name().to_string(), handle.mode());
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    registry.contains_key(&key).then_some(key)
}

/// Register the three built-in transports in both modes. Idempotent;
/// intended to run once at process start.
pub fn register_defaults() {
    register("https", Mode::Sync, |config| {
        Ok(BackendHandle::Sync(Box::new(HttpsBackend::new(
            &config.api,
        )?)))
    });
    register("https", Mode::Async, |config| {
        Ok(BackendHandle::Async(Box::new(AsyncHttpsBackend::new(
            &config.api,
        )?)))
    });
    register("cli", Mode::Sync, |config| {
        Ok(BackendHandle::Sync(Box::new(CliBackend::new(&config.cli))))
    });
    register("cli", Mode::Async, |config| {
        Ok(BackendHandle::Async(Box::new(AsyncCliBackend::new(
            &config.cli,
        ))))
    });
    register("ssh", Mode::Sync, |config| {
        Ok(BackendHandle::Sync(Box::new(SshBackend::new(
            &config.ssh,
            &config.cli.entry_point,
        )?)))
    });
    register("ssh", Mode::Async, |config| {
        Ok(BackendHandle::Async(Box::new(AsyncSshBackend::new(
            &config.ssh,
            &config.cli.entry_point,
        )?)))
    });
}
