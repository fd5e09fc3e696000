//! Tests for the fluent call builder

use pve_client::error::Error;
use pve_client::projection::FilterSpec;
use pve_client::{ApiResponse, ClientConfig, Method, PveClient};
use serde_json::json;

use crate::common::mocks::{EchoBackend, ScriptedBackend};

fn echo_client() -> (PveClient, crate::common::mocks::RequestLog) {
    let backend = EchoBackend::new();
    let log = backend.log_handle();
    (
        PveClient::with_backend(Box::new(backend), ClientConfig::default()),
        log,
    )
}

// =============================================================================
// Path building determinism
// =============================================================================

#[test]
fn chain_resolves_to_slash_joined_endpoint() {
    let (client, _) = echo_client();
    let request = client
        .call()
        .segment("nodes")
        .id("c01")
        .segment("status")
        .request_descriptor("get", None)
        .unwrap();
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.endpoint, "nodes/c01/status");
    assert!(request.body.is_none());
}

#[test]
fn create_alias_maps_to_post_with_body() {
    let (client, _) = echo_client();
    let body = json!({"group": "g1", "nodes": "c01,c02"});
    let request = client
        .call()
        .segment("cluster")
        .segment("ha")
        .segment("groups")
        .request_descriptor("create", Some(body.clone()))
        .unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.endpoint, "cluster/ha/groups");
    assert_eq!(request.body, Some(body));
}

#[test]
fn set_alias_maps_to_put() {
    let (client, _) = echo_client();
    let request = client
        .call()
        .segment("nodes")
        .id("c01")
        .segment("config")
        .request_descriptor("set", None)
        .unwrap();
    assert_eq!(request.method, Method::Put);
}

#[test]
fn numeric_ids_become_path_segments() {
    let (client, _) = echo_client();
    let request = client
        .call()
        .segment("nodes")
        .id("c01")
        .segment("qemu")
        .id(101)
        .segment("clone")
        .request_descriptor("post", None)
        .unwrap();
    assert_eq!(request.endpoint, "nodes/c01/qemu/101/clone");
}

#[test]
fn unknown_verb_is_rejected_before_any_io() {
    let (client, log) = echo_client();
    let result = client.call().segment("nodes").exec("patch", None);
    assert!(matches!(result, Err(Error::UnsupportedVerb(_))));
    assert!(log.lock().unwrap().is_empty());
}

// =============================================================================
// Execution and failure collapsing
// =============================================================================

#[test]
fn terminal_get_dispatches_the_built_endpoint() {
    let (client, log) = echo_client();
    let result = client
        .call()
        .segment("nodes")
        .id("c01")
        .segment("status")
        .get();
    assert_eq!(result, Some(json!("nodes/c01/status")));
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].method, Method::Get);
    assert_eq!(log[0].endpoint, "nodes/c01/status");
}

#[test]
fn post_sends_the_body_through() {
    let (client, log) = echo_client();
    let body = json!({"group": "g1", "nodes": "c01,c02"});
    client
        .call()
        .segment("cluster")
        .segment("ha")
        .segment("groups")
        .post(Some(body.clone()));
    assert_eq!(log.lock().unwrap()[0].body, Some(body));
}

#[test]
fn transport_failure_collapses_to_none() {
    let backend = ScriptedBackend::new(vec![ApiResponse::failure(595, "connection refused")]);
    let client = PveClient::with_backend(Box::new(backend), ClientConfig::default());
    assert_eq!(client.call().segment("nodes").get(), None);
}

#[test]
fn success_without_data_yields_none() {
    let backend = ScriptedBackend::new(vec![ApiResponse::success(200, None)]);
    let client = PveClient::with_backend(Box::new(backend), ClientConfig::default());
    assert_eq!(client.call().segment("version").get(), None);
}

#[test]
fn filter_keys_project_the_response() {
    let payload = json!([
        {"node": "c01", "status": "online"},
        {"node": "c02", "status": "offline"},
    ]);
    let backend = ScriptedBackend::new(vec![ApiResponse::success(200, Some(payload))]);
    let client = PveClient::with_backend(Box::new(backend), ClientConfig::default());
    let result = client
        .call()
        .segment("nodes")
        .filter_keys(FilterSpec::key("node"))
        .get();
    assert_eq!(result, Some(json!(["c01", "c02"])));
}

// =============================================================================
// Async builder
// =============================================================================

#[tokio::test]
async fn async_chain_builds_and_dispatches() {
    use crate::common::mocks::AsyncEchoBackend;
    use pve_client::AsyncPveClient;

    let backend = AsyncEchoBackend::new();
    let log = backend.log_handle();
    let client = AsyncPveClient::with_backend(Box::new(backend), ClientConfig::default());

    let request = client
        .call()
        .segment("cluster")
        .segment("ha")
        .segment("groups")
        .request_descriptor("create", Some(json!({"group": "g1"})))
        .unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.endpoint, "cluster/ha/groups");

    let result = client
        .call()
        .segment("nodes")
        .id("c02")
        .segment("status")
        .get()
        .await;
    assert_eq!(result, Some(json!("nodes/c02/status")));
    assert_eq!(log.lock().unwrap().len(), 1);
}
