//! Tests for the command-line transport, using real subprocesses with the
//! entry point swapped for standard tools.

use pve_client::backends::{AsyncBackend, AsyncCliBackend, Backend, CliBackend};
use pve_client::config::CliConfig;
use pve_client::request::{Method, Request};
use pve_client::response::STATUS_UNAVAILABLE;
use serde_json::Value;

fn backend_for(entry_point: &str) -> CliBackend {
    CliBackend::new(&CliConfig {
        entry_point: entry_point.to_string(),
    })
}

#[test]
fn plain_text_output_is_data_not_an_error() {
    // `echo` prints the formatted arguments back; the output is not JSON,
    // so the backend must fall back to the raw text.
    let mut backend = backend_for("echo");
    backend.connect().unwrap();
    let response = backend.request(&Request::new(Method::Get, "version"));
    assert!(response.success);
    assert_eq!(response.status_code, 0);
    assert_eq!(
        response.data,
        Some(Value::String("get /version --output-format json".to_string()))
    );
    backend.disconnect();
}

#[test]
fn nonzero_exit_becomes_a_failed_envelope() {
    let mut backend = backend_for("false");
    backend.connect().unwrap();
    let response = backend.request(&Request::new(Method::Get, "version"));
    assert!(!response.success);
    assert_eq!(response.status_code, 1);
    assert!(response.data.is_none());
    assert!(response.error.is_some());
}

#[test]
fn spawn_failure_becomes_a_failed_envelope_with_sentinel() {
    let mut backend = backend_for("/nonexistent/pvesh-test-binary");
    backend.connect().unwrap();
    let response = backend.request(&Request::new(Method::Get, "version"));
    assert!(!response.success);
    assert_eq!(response.status_code, STATUS_UNAVAILABLE);
    assert!(response.error.is_some());
}

#[test]
fn unresolved_placeholder_fails_without_spawning() {
    let mut backend = backend_for("echo");
    let response = backend.request(&Request::new(Method::Get, "nodes/{node}/status"));
    assert!(!response.success);
    assert!(
        response
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("missing path parameter")
    );
}

#[tokio::test]
async fn async_backend_matches_the_blocking_classification() {
    let mut backend = AsyncCliBackend::new(&CliConfig {
        entry_point: "echo".to_string(),
    });
    backend.connect().await.unwrap();
    let response = backend.request(&Request::new(Method::Get, "version")).await;
    assert!(response.success);
    assert_eq!(response.status_code, 0);

    let mut failing = AsyncCliBackend::new(&CliConfig {
        entry_point: "false".to_string(),
    });
    failing.connect().await.unwrap();
    let response = failing.request(&Request::new(Method::Get, "version")).await;
    assert!(!response.success);
    assert_eq!(response.status_code, 1);
}
