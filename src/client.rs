//! Client facade and fluent request builder
//!
//! A client owns one backend instance and exposes three call surfaces:
//!
//! - the fluent builder:
//!   `client.call().segment("nodes").id("c01").segment("status").get()`
//! - the low-level escape hatch: `client.request(method, endpoint, ...)`,
//!   which returns the full envelope for callers that must distinguish an
//!   empty result from a failed one
//! - the task poller, defined in [`crate::task`]
//!
//! Terminal verbs on the builder deliberately collapse transport failures
//! into `None` plus an error log, trading strict error visibility for terse
//! call sites.
//!
//! Each call to [`PveClient::call`] returns a fresh builder that owns its
//! own segment list, so any number of concurrent logical calls can share
//! one client without observing each other's paths. The backend connection
//! is the only shared state and sits behind a mutex: one in-flight request
//! per client instance; construct more clients for fan-out.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::backends::{AsyncBackend, Backend, BackendHandle};
use crate::config::ClientConfig;
use crate::error::Error;
use crate::projection::{FilterSpec, project};
use crate::registry::{self, Mode};
use crate::request::{Method, Request};
use crate::response::ApiResponse;

/// A constructed client of either concurrency mode
#[derive(Debug)]
pub enum Client {
    /// Blocking client
    Sync(PveClient),
    /// Non-blocking client
    Async(AsyncPveClient),
}

/// Construct a client for a registered transport.
///
/// Resolves `(name, mode)` through the process-wide registry; an unknown
/// pair is a configuration error, raised here rather than deferred to the
/// first request.
pub fn new_client(name: &str, mode: Mode, config: ClientConfig) -> Result<Client, Error> {
    let factory = registry::resolve(name, mode).ok_or_else(|| Error::UnknownBackend {
        name: name.to_string(),
        mode,
    })?;
    let handle = factory(&config)?;
    if handle.mode() != mode {
        return Err(Error::UnknownBackend {
            name: name.to_string(),
            mode,
        });
    }
    Ok(match handle {
        BackendHandle::Sync(backend) => Client::Sync(PveClient::with_backend(backend, config)),
        BackendHandle::Async(backend) => {
            Client::Async(AsyncPveClient::with_backend(backend, config))
        }
    })
}

/// Collapse an envelope into the projected payload, logging failures
fn analyze(request: &Request, response: ApiResponse, filter: Option<&FilterSpec>) -> Option<Value> {
    if !response.success {
        log::error!(
            "{} /{} failed: status {}{}",
            request.method,
            request.endpoint,
            response.status_code,
            response
                .error
                .as_deref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default(),
        );
        return None;
    }
    let data = response.data?;
    project(&data, filter)
}

// ---------------------------------------------------------------------------
// Blocking client
// ---------------------------------------------------------------------------

/// Blocking client over a registered transport
pub struct PveClient {
    backend: Mutex<Box<dyn Backend>>,
    backend_name: &'static str,
    config: ClientConfig,
}

impl fmt::Debug for PveClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PveClient")
            .field("backend", &self.backend_name)
            .finish_non_exhaustive()
    }
}

impl PveClient {
    /// Construct a blocking client for a registered transport name
    pub fn new(name: &str, config: ClientConfig) -> Result<Self, Error> {
        match new_client(name, Mode::Sync, config)? {
            Client::Sync(client) => Ok(client),
            Client::Async(_) => Err(Error::UnknownBackend {
                name: name.to_string(),
                mode: Mode::Sync,
            }),
        }
    }

    /// Wrap an already-constructed backend
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>, config: ClientConfig) -> Self {
        let backend_name = backend.name();
        Self {
            backend: Mutex::new(backend),
            backend_name,
            config,
        }
    }

    /// Connection parameters this client was built with
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn backend(&self) -> std::sync::MutexGuard<'_, Box<dyn Backend>> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire the backend connection
    pub fn connect(&self) -> Result<(), Error> {
        self.backend().connect()
    }

    /// Release the backend connection
    pub fn disconnect(&self) {
        self.backend().disconnect();
    }

    /// Connect and return a guard that disconnects when dropped
    pub fn session(&self) -> Result<Session<'_>, Error> {
        self.connect()?;
        Ok(Session { client: self })
    }

    /// Begin a fluent call; the returned builder owns its path
    #[must_use]
    pub fn call(&self) -> CallBuilder<'_> {
        CallBuilder {
            client: self,
            segments: Vec::new(),
            filter: None,
        }
    }

    /// Low-level request, bypassing the fluent builder. Returns the full
    /// envelope so callers can tell an empty result from a failed one.
    pub fn request(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<BTreeMap<String, String>>,
        data: Option<Value>,
    ) -> ApiResponse {
        let request = Request {
            method,
            endpoint: endpoint.to_string(),
            path_params: params.unwrap_or_default(),
            query_params: BTreeMap::new(),
            body: data,
        };
        self.execute(&request)
    }

    /// Execute a fully-assembled request descriptor
    pub fn execute(&self, request: &Request) -> ApiResponse {
        self.backend().request(request)
    }
}

/// Scoped session over a blocking client; disconnects on drop
#[derive(Debug)]
pub struct Session<'a> {
    client: &'a PveClient,
}

impl std::ops::Deref for Session<'_> {
    type Target = PveClient;

    fn deref(&self) -> &Self::Target {
        self.client
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.client.disconnect();
    }
}

/// One in-progress fluent call on a blocking client.
///
/// The builder accumulates path segments and resolves them on a terminal
/// verb. It is a plain value: moving it between threads is fine, sharing it
/// is impossible, which is what guarantees call isolation.
#[derive(Debug)]
pub struct CallBuilder<'a> {
    client: &'a PveClient,
    segments: Vec<String>,
    filter: Option<FilterSpec>,
}

impl CallBuilder<'_> {
    /// Append a literal path segment
    #[must_use]
    pub fn segment(mut self, name: &str) -> Self {
        self.segments.push(name.trim_matches('/').to_string());
        self
    }

    /// Append a resource identifier as a path segment
    #[must_use]
    pub fn id(mut self, value: impl fmt::Display) -> Self {
        self.segments.push(value.to_string());
        self
    }

    /// Project the response through the given filter before returning it
    #[must_use]
    pub fn filter_keys(mut self, filter: FilterSpec) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Assemble the request this chain would execute, without performing
    /// any I/O. Accepts the `create`/`set` verb aliases; an unrecognized
    /// verb is a configuration error.
    pub fn request_descriptor(&self, verb: &str, data: Option<Value>) -> Result<Request, Error> {
        let method = Method::parse(verb)?;
        Ok(Request {
            method,
            endpoint: self.segments.join("/"),
            body: data,
            ..Request::default()
        })
    }

    /// Execute with a dynamic verb name (including aliases)
    pub fn exec(self, verb: &str, data: Option<Value>) -> Result<Option<Value>, Error> {
        let request = self.request_descriptor(verb, data)?;
        Ok(self.finish(request))
    }

    /// Execute as a GET
    #[must_use]
    pub fn get(self) -> Option<Value> {
        self.terminal(Method::Get, None)
    }

    /// Execute as a POST with an optional body
    #[must_use]
    pub fn post(self, data: Option<Value>) -> Option<Value> {
        self.terminal(Method::Post, data)
    }

    /// Execute as a PUT with an optional body
    #[must_use]
    pub fn put(self, data: Option<Value>) -> Option<Value> {
        self.terminal(Method::Put, data)
    }

    /// Execute as a DELETE
    #[must_use]
    pub fn delete(self) -> Option<Value> {
        self.terminal(Method::Delete, None)
    }

    fn terminal(self, method: Method, data: Option<Value>) -> Option<Value> {
        let request = Request {
            method,
            endpoint: self.segments.join("/"),
            body: data,
            ..Request::default()
        };
        self.finish(request)
    }

    fn finish(self, request: Request) -> Option<Value> {
        let response = self.client.execute(&request);
        analyze(&request, response, self.filter.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Non-blocking client
// ---------------------------------------------------------------------------

/// Non-blocking client over a registered transport
pub struct AsyncPveClient {
    backend: tokio::sync::Mutex<Box<dyn AsyncBackend>>,
    backend_name: &'static str,
    config: ClientConfig,
}

impl fmt::Debug for AsyncPveClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncPveClient")
            .field("backend", &self.backend_name)
            .finish_non_exhaustive()
    }
}

impl AsyncPveClient {
    /// Construct a non-blocking client for a registered transport name
    pub fn new(name: &str, config: ClientConfig) -> Result<Self, Error> {
        match new_client(name, Mode::Async, config)? {
            Client::Async(client) => Ok(client),
            Client::Sync(_) => Err(Error::UnknownBackend {
                name: name.to_string(),
                mode: Mode::Async,
            }),
        }
    }

    /// Wrap an already-constructed backend
    #[must_use]
    pub fn with_backend(backend: Box<dyn AsyncBackend>, config: ClientConfig) -> Self {
        let backend_name = backend.name();
        Self {
            backend: tokio::sync::Mutex::new(backend),
            backend_name,
            config,
        }
    }

    /// Connection parameters this client was built with
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Acquire the backend connection
    pub async fn connect(&self) -> Result<(), Error> {
        self.backend.lock().await.connect().await
    }

    /// Release the backend connection
    pub async fn disconnect(&self) {
        self.backend.lock().await.disconnect().await;
    }

    /// Begin a fluent call; the returned builder owns its path
    #[must_use]
    pub fn call(&self) -> AsyncCallBuilder<'_> {
        AsyncCallBuilder {
            client: self,
            segments: Vec::new(),
            filter: None,
        }
    }

    /// Low-level request, bypassing the fluent builder. Returns the full
    /// envelope so callers can tell an empty result from a failed one.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<BTreeMap<String, String>>,
        data: Option<Value>,
    ) -> ApiResponse {
        let request = Request {
            method,
            endpoint: endpoint.to_string(),
            path_params: params.unwrap_or_default(),
            query_params: BTreeMap::new(),
            body: data,
        };
        self.execute(&request).await
    }

    /// Execute a fully-assembled request descriptor
    pub async fn execute(&self, request: &Request) -> ApiResponse {
        self.backend.lock().await.request(request).await
    }
}

/// One in-progress fluent call on a non-blocking client.
///
/// Isolation works exactly as for [`CallBuilder`]: every logical call owns
/// its builder, so coroutines interleaved on one event loop cannot corrupt
/// each other's paths.
#[derive(Debug)]
pub struct AsyncCallBuilder<'a> {
    client: &'a AsyncPveClient,
    segments: Vec<String>,
    filter: Option<FilterSpec>,
}

impl AsyncCallBuilder<'_> {
    /// Append a literal path segment
    #[must_use]
    pub fn segment(mut self, name: &str) -> Self {
        self.segments.push(name.trim_matches('/').to_string());
        self
    }

    /// Append a resource identifier as a path segment
    #[must_use]
    pub fn id(mut self, value: impl fmt::Display) -> Self {
        self.segments.push(value.to_string());
        self
    }

    /// Project the response through the given filter before returning it
    #[must_use]
    pub fn filter_keys(mut self, filter: FilterSpec) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Assemble the request this chain would execute, without performing
    /// any I/O. Accepts the `create`/`set` verb aliases; an unrecognized
    /// verb is a configuration error.
    pub fn request_descriptor(&self, verb: &str, data: Option<Value>) -> Result<Request, Error> {
        let method = Method::parse(verb)?;
        Ok(Request {
            method,
            endpoint: self.segments.join("/"),
            body: data,
            ..Request::default()
        })
    }

    /// Execute with a dynamic verb name (including aliases)
    pub async fn exec(self, verb: &str, data: Option<Value>) -> Result<Option<Value>, Error> {
        let request = self.request_descriptor(verb, data)?;
        Ok(self.finish(request).await)
    }

    /// Execute as a GET
    pub async fn get(self) -> Option<Value> {
        self.terminal(Method::Get, None).await
    }

    /// Execute as a POST with an optional body
    pub async fn post(self, data: Option<Value>) -> Option<Value> {
        self.terminal(Method::Post, data).await
    }

    /// Execute as a PUT with an optional body
    pub async fn put(self, data: Option<Value>) -> Option<Value> {
        self.terminal(Method::Put, data).await
    }

    /// Execute as a DELETE
    pub async fn delete(self) -> Option<Value> {
        self.terminal(Method::Delete, None).await
    }

    async fn terminal(self, method: Method, data: Option<Value>) -> Option<Value> {
        let request = Request {
            method,
            endpoint: self.segments.join("/"),
            body: data,
            ..Request::default()
        };
        self.finish(request).await
    }

    async fn finish(self, request: Request) -> Option<Value> {
        let response = self.client.execute(&request).await;
        analyze(&request, response, self.filter.as_ref())
    }
}
