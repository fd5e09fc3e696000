//! Remote-shell transport
//!
//! Runs the same `pvesh` invocations as the CLI transport, but over a
//! persistent SSH session on a cluster node. Authentication is password,
//! key file, or the running agent. Host keys are checked against the
//! user's known-hosts file; accepting an unknown key is an explicit opt-in
//! (`ssh.accept_host_key`) and the accepted identity is logged so the
//! operator can persist it manually.
//!
//! The async variant wraps the blocking session in `spawn_blocking`; the
//! session still serves one in-flight request at a time, which matches the
//! one-logical-connection-per-instance contract of the backend layer.

use std::borrow::Cow;
use std::io::Read;
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ssh2::{CheckResult, KnownHostFileKind, Session};

use crate::backends::{AsyncBackend, Backend, format_command};
use crate::config::SshConfig;
use crate::error::Error;
use crate::request::Request;
use crate::response::ApiResponse;

const BACKEND_NAME: &str = "ssh";

/// Blocking remote-shell backend
pub struct SshBackend {
    config: SshConfig,
    entry_point: String,
    session: Option<Session>,
}

impl std::fmt::Debug for SshBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshBackend")
            .field("hostname", &self.config.hostname)
            .field("port", &self.config.port)
            .field("username", &self.config.username)
            .field("connected", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl SshBackend {
    /// Build a backend from the SSH and CLI sections of the configuration.
    /// The CLI entry point is reused for the remote command.
    pub fn new(config: &SshConfig, entry_point: &str) -> Result<Self, Error> {
        if config.hostname.is_empty() {
            return Err(Error::MissingConfig("ssh.hostname"));
        }
        if config.username.is_empty() {
            return Err(Error::MissingConfig("ssh.username"));
        }
        Ok(Self {
            config: config.clone(),
            entry_point: entry_point.to_string(),
            session: None,
        })
    }

    fn known_hosts_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| Path::new(&home).join(".ssh").join("known_hosts"))
    }

    /// Check the remote host key against known hosts. Unknown keys are
    /// rejected unless `accept_host_key` is set, in which case the identity
    /// is logged for the operator to persist.
    fn check_host_key(&self, session: &Session) -> Result<(), Error> {
        let (key, _) = session
            .host_key()
            .ok_or_else(|| Error::Connect("remote offered no host key".to_string()))?;
        let mut known_hosts = session
            .known_hosts()
            .map_err(|e| Error::Connect(format!("cannot inspect known hosts: {e}")))?;
        if let Some(path) = Self::known_hosts_path() {
            if path.exists() {
                known_hosts
                    .read_file(&path, KnownHostFileKind::OpenSSH)
                    .map_err(|e| Error::Connect(format!("cannot read known hosts: {e}")))?;
            }
        }
        match known_hosts.check_port(&self.config.hostname, self.config.port, key) {
            CheckResult::Match => Ok(()),
            CheckResult::Mismatch => Err(Error::Connect(format!(
                "host key mismatch for {}",
                self.config.hostname
            ))),
            CheckResult::NotFound | CheckResult::Failure => {
                if self.config.accept_host_key {
                    log::warn!(
                        "accepting unknown host key for {} ({}); persist it in known_hosts to silence this",
                        self.config.hostname,
                        self.fingerprint(session),
                    );
                    Ok(())
                } else {
                    Err(Error::Connect(format!(
                        "unknown host key for {}; set ssh.accept_host_key to trust on first connect",
                        self.config.hostname
                    )))
                }
            }
        }
    }

    fn fingerprint(&self, session: &Session) -> String {
        session
            .host_key_hash(ssh2::HashType::Sha1)
            .map(|hash| {
                hash.iter()
                    .map(|byte| format!("{byte:02x}"))
                    .collect::<Vec<_>>()
                    .join(":")
            })
            .unwrap_or_else(|| "unavailable".to_string())
    }

    fn open_session(&self) -> Result<Session, Error> {
        let address = (self.config.hostname.as_str(), self.config.port);
        let tcp = TcpStream::connect(address).map_err(|e| {
            Error::Connect(format!("cannot reach {}: {e}", self.config.hostname))
        })?;
        let mut session =
            Session::new().map_err(|e| Error::Connect(format!("SSH init failed: {e}")))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| Error::Connect(format!("SSH handshake failed: {e}")))?;
        self.check_host_key(&session)?;
        self.authenticate(&session)?;
        Ok(session)
    }

    fn authenticate(&self, session: &Session) -> Result<(), Error> {
        let username = &self.config.username;
        if self.config.agent {
            session
                .userauth_agent(username)
                .map_err(|e| Error::Connect(format!("agent auth failed: {e}")))?;
        } else if let Some(key_file) = &self.config.key_file {
            session
                .userauth_pubkey_file(
                    username,
                    None,
                    Path::new(key_file),
                    self.config.password.as_deref(),
                )
                .map_err(|e| Error::Connect(format!("key auth failed: {e}")))?;
        } else if let Some(password) = &self.config.password {
            session
                .userauth_password(username, password)
                .map_err(|e| Error::Connect(format!("password auth failed: {e}")))?;
        } else {
            return Err(Error::Connect(
                "no SSH authentication method configured".to_string(),
            ));
        }
        if session.authenticated() {
            Ok(())
        } else {
            Err(Error::Connect("SSH authentication failed".to_string()))
        }
    }

    /// Run one remote command on the open session, reducing the
    /// stdout/stderr/exit-status triple to the normalized envelope.
    fn execute(session: &Session, command: &str) -> ApiResponse {
        let mut channel = match session.channel_session() {
            Ok(channel) => channel,
            Err(e) => return ApiResponse::unavailable(format!("cannot open channel: {e}")),
        };
        if let Err(e) = channel.exec(command) {
            return ApiResponse::unavailable(format!("exec failed: {e}"));
        }
        let mut stdout = String::new();
        let mut stderr = String::new();
        if let Err(e) = channel.read_to_string(&mut stdout) {
            return ApiResponse::unavailable(format!("cannot read remote stdout: {e}"));
        }
        if let Err(e) = channel.stderr().read_to_string(&mut stderr) {
            return ApiResponse::unavailable(format!("cannot read remote stderr: {e}"));
        }
        if let Err(e) = channel.wait_close() {
            return ApiResponse::unavailable(format!("channel close failed: {e}"));
        }
        let exit_status = match channel.exit_status() {
            Ok(status) => i64::from(status),
            Err(e) => return ApiResponse::unavailable(format!("no exit status: {e}")),
        };
        if exit_status == 0 {
            ApiResponse::success(exit_status, ApiResponse::decode_output(&stdout))
        } else {
            let diagnostic = stderr.trim();
            let diagnostic = if diagnostic.is_empty() {
                format!("remote command exited with status {exit_status}")
            } else {
                diagnostic.to_string()
            };
            ApiResponse::failure(exit_status, diagnostic)
        }
    }

    fn shell_command(&self, request: &Request) -> Result<String, Error> {
        let parts = format_command(&self.entry_point, request)?;
        Ok(parts
            .iter()
            .map(|part| shell_escape::escape(Cow::from(part.as_str())).into_owned())
            .collect::<Vec<_>>()
            .join(" "))
    }
}

impl Backend for SshBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn connect(&mut self) -> Result<(), Error> {
        self.session = Some(self.open_session()?);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.disconnect(None, "closing session", None);
        }
    }

    fn request(&mut self, request: &Request) -> ApiResponse {
        let command = match self.shell_command(request) {
            Ok(command) => command,
            Err(e) => return ApiResponse::unavailable(e.to_string()),
        };
        let one_shot = self.session.is_none();
        if one_shot {
            log::warn!("SSH session not connected; creating a one-shot connection");
            if let Err(e) = self.connect() {
                return ApiResponse::unavailable(e.to_string());
            }
        }
        log::debug!("running remote command: {command}");
        let response = match &self.session {
            Some(session) => Self::execute(session, &command),
            None => ApiResponse::unavailable("SSH session not connected"),
        };
        if one_shot {
            self.disconnect();
        }
        response
    }
}

/// Non-blocking remote-shell backend.
///
/// Owns a blocking [`SshBackend`] and moves it onto the blocking thread
/// pool for each operation, so awaiting callers are suspended rather than
/// blocked while the remote command runs.
pub struct AsyncSshBackend {
    inner: Option<SshBackend>,
}

impl std::fmt::Debug for AsyncSshBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSshBackend")
            .field("inner", &self.inner)
            .finish()
    }
}

impl AsyncSshBackend {
    /// Build a backend from the SSH and CLI sections of the configuration
    pub fn new(config: &SshConfig, entry_point: &str) -> Result<Self, Error> {
        Ok(Self {
            inner: Some(SshBackend::new(config, entry_point)?),
        })
    }

    async fn with_inner<T, F>(&mut self, op: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SshBackend) -> T + Send + 'static,
    {
        let mut inner = self.inner.take()?;
        let result = tokio::task::spawn_blocking(move || {
            let result = op(&mut inner);
            (inner, result)
        })
        .await;
        match result {
            Ok((inner, result)) => {
                self.inner = Some(inner);
                Some(result)
            }
            // The blocking task panicked and took the session with it.
            Err(e) => {
                log::error!("SSH worker task failed: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl AsyncBackend for AsyncSshBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn connect(&mut self) -> Result<(), Error> {
        match self.with_inner(|inner| inner.connect()).await {
            Some(result) => result,
            None => Err(Error::Connect("SSH session lost".to_string())),
        }
    }

    async fn disconnect(&mut self) {
        self.with_inner(|inner| inner.disconnect()).await;
    }

    async fn request(&mut self, request: &Request) -> ApiResponse {
        let request = request.clone();
        match self
            .with_inner(move |inner| inner.request(&request))
            .await
        {
            Some(response) => response,
            None => ApiResponse::unavailable("SSH session lost"),
        }
    }
}
