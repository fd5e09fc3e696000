//! Task handles and completion polling
//!
//! Mutating calls against the control plane return a UPID - an opaque
//! string identifying the long-running remote task. [`Upid`] decodes its
//! nine colon-delimited fields; [`PveClient::wait_task_done`] and its async
//! counterpart poll the task's status endpoint at a fixed interval until it
//! reports `stopped` or the configured timeout elapses.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::client::{AsyncPveClient, PveClient};
use crate::error::Error;
use crate::projection::FilterSpec;

/// Status string that marks a finished task
const TERMINAL_STATUS: &str = "stopped";

/// Decoded task handle.
///
/// Wire form:
/// `UPID:<node>:<pid hex>:<pstart hex>:<starttime hex>:<type>:<id>:<user>:<comment>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upid {
    raw: String,
    /// Node the task runs on
    pub node: String,
    /// Worker process id
    pub pid: u32,
    /// Process start cycle
    pub pstart: u64,
    /// Task start time, epoch seconds
    pub starttime: i64,
    /// Task type, e.g. `qmclone`
    pub task_type: String,
    /// Resource the task acts on
    pub id: String,
    /// User that started the task, realm suffix stripped
    pub user: String,
    /// Free-form comment
    pub comment: String,
}

impl Upid {
    /// Decode a UPID string; the tag and field count are structural and a
    /// mismatch is an error, not a failed envelope.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let malformed = || Error::MalformedUpid(raw.to_string());
        let segments: Vec<&str> = raw.split(':').collect();
        if segments.len() != 9 || segments[0] != "UPID" {
            return Err(malformed());
        }
        Ok(Self {
            raw: raw.to_string(),
            node: segments[1].to_string(),
            pid: u32::from_str_radix(segments[2], 16).map_err(|_| malformed())?,
            pstart: u64::from_str_radix(segments[3], 16).map_err(|_| malformed())?,
            starttime: i64::from_str_radix(segments[4], 16).map_err(|_| malformed())?,
            task_type: segments[5].to_string(),
            id: segments[6].to_string(),
            user: segments[7].split('!').next().unwrap_or("").to_string(),
            comment: segments[8].to_string(),
        })
    }

    /// The handle as received on the wire
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Upid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compact handle rendering for log lines: the node through id fields,
/// without the tag and trailing user/comment
fn shorten(upid: &str) -> String {
    upid.split(':').skip(1).take(6).collect::<Vec<_>>().join(":")
}

/// Format a duration as HH:MM:SS
fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{:02}:{:02}:{:02}", total / 3600, total % 3600 / 60, total % 60)
}

fn log_tick(upid: &str, elapsed: Duration, timeout: Duration) {
    log::info!(
        "waiting for task ({}) to finish... [ {} / {} ]",
        shorten(upid),
        format_duration(elapsed),
        format_duration(timeout),
    );
}

fn log_timeout(upid: &str) {
    log::warn!(
        "timeout reached while waiting for task {} to finish",
        shorten(upid),
    );
}

fn resolve_node(upid: &str, node: Option<&str>) -> Result<String, Error> {
    match node {
        Some(node) => Ok(node.to_string()),
        None => Ok(Upid::parse(upid)?.node),
    }
}

impl PveClient {
    /// Current status of a task, or `None` when the status endpoint has
    /// nothing for this handle (or the call failed)
    #[must_use]
    pub fn task_status(&self, upid: &str, node: &str) -> Option<String> {
        let status = self
            .call()
            .segment("nodes")
            .id(node)
            .segment("tasks")
            .id(upid)
            .segment("status")
            .filter_keys(FilterSpec::key("status"))
            .get()?;
        status.as_str().map(ToString::to_string)
    }

    /// Wait for a task to complete, polling at the configured interval.
    ///
    /// Returns `Ok(true)` when the task reaches the terminal status,
    /// `Ok(false)` on timeout (logged as a warning) or when the status
    /// endpoint immediately reports nothing. The node is recovered from the
    /// handle when not given; a malformed handle is an eager error.
    pub fn wait_task_done(&self, upid: &str, node: Option<&str>) -> Result<bool, Error> {
        self.wait_task_done_with(
            upid,
            node,
            self.config().timeout(),
            self.config().polling_interval(),
        )
    }

    /// [`Self::wait_task_done`] with an explicit timeout and interval
    pub fn wait_task_done_with(
        &self,
        upid: &str,
        node: Option<&str>,
        timeout: Duration,
        interval: Duration,
    ) -> Result<bool, Error> {
        let node = resolve_node(upid, node)?;
        let start = Instant::now();
        while let Some(status) = self.task_status(upid, &node) {
            if status == TERMINAL_STATUS {
                return Ok(true);
            }
            log_tick(upid, start.elapsed(), timeout);
            std::thread::sleep(interval);
            if start.elapsed() > timeout {
                log_timeout(upid);
                break;
            }
        }
        Ok(false)
    }
}

impl AsyncPveClient {
    /// Current status of a task, or `None` when the status endpoint has
    /// nothing for this handle (or the call failed)
    pub async fn task_status(&self, upid: &str, node: &str) -> Option<String> {
        let status = self
            .call()
            .segment("nodes")
            .id(node)
            .segment("tasks")
            .id(upid)
            .segment("status")
            .filter_keys(FilterSpec::key("status"))
            .get()
            .await?;
        status.as_str().map(ToString::to_string)
    }

    /// Wait for a task to complete, polling at the configured interval.
    ///
    /// Suspends only its own calling task between polls; concurrent callers
    /// on the same runtime are unaffected. Semantics match
    /// [`PveClient::wait_task_done`].
    pub async fn wait_task_done(&self, upid: &str, node: Option<&str>) -> Result<bool, Error> {
        self.wait_task_done_with(
            upid,
            node,
            self.config().timeout(),
            self.config().polling_interval(),
        )
        .await
    }

    /// [`Self::wait_task_done`] with an explicit timeout and interval
    pub async fn wait_task_done_with(
        &self,
        upid: &str,
        node: Option<&str>,
        timeout: Duration,
        interval: Duration,
    ) -> Result<bool, Error> {
        let node = resolve_node(upid, node)?;
        let start = Instant::now();
        while let Some(status) = self.task_status(upid, &node).await {
            if status == TERMINAL_STATUS {
                return Ok(true);
            }
            log_tick(upid, start.elapsed(), timeout);
            tokio::time::sleep(interval).await;
            if start.elapsed() > timeout {
                log_timeout(upid);
                break;
            }
        }
        Ok(false)
    }
}
