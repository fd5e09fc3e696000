//! Tests for the normalized response envelope

use pve_client::response::{ApiResponse, STATUS_UNAVAILABLE};
use pve_client::{ClientConfig, Method, PveClient};
use serde_json::json;

use crate::common::mocks::ScriptedBackend;

// =============================================================================
// Constructors
// =============================================================================

#[test]
fn success_envelope_carries_data() {
    let envelope = ApiResponse::success(200, Some(json!({"version": "8.3.2"})));
    assert!(envelope.success);
    assert_eq!(envelope.status_code, 200);
    assert_eq!(envelope.data, Some(json!({"version": "8.3.2"})));
    assert!(envelope.error.is_none());
}

#[test]
fn failure_envelope_has_no_data() {
    let envelope = ApiResponse::failure(500, "internal error");
    assert!(!envelope.success);
    assert_eq!(envelope.status_code, 500);
    assert!(envelope.data.is_none());
    assert_eq!(envelope.error.as_deref(), Some("internal error"));
}

#[test]
fn unavailable_uses_the_sentinel_status() {
    let envelope = ApiResponse::unavailable("connection refused");
    assert_eq!(envelope.status_code, STATUS_UNAVAILABLE);
    assert!(!envelope.success);
}

// =============================================================================
// Output decoding
// =============================================================================

#[test]
fn empty_output_decodes_to_no_data() {
    assert_eq!(ApiResponse::decode_output(""), None);
    assert_eq!(ApiResponse::decode_output("  \n"), None);
}

#[test]
fn json_output_decodes_to_structured_data() {
    assert_eq!(
        ApiResponse::decode_output(r#"{"release": "8.3"}"#),
        Some(json!({"release": "8.3"}))
    );
}

#[test]
fn plain_text_output_is_kept_as_data_not_error() {
    assert_eq!(
        ApiResponse::decode_output("no such node\n"),
        Some(json!("no such node"))
    );
}

// =============================================================================
// Normalization through the client boundary
// =============================================================================

#[test]
fn low_level_request_passes_envelopes_through_unchanged() {
    let backend = ScriptedBackend::new(vec![
        ApiResponse::success(200, Some(json!([{"node": "c01"}]))),
        ApiResponse::failure(1, "no route to host"),
    ]);
    let client = PveClient::with_backend(Box::new(backend), ClientConfig::default());

    let ok = client.request(Method::Get, "nodes", None, None);
    assert!(ok.success);
    assert_eq!(ok.data, Some(json!([{"node": "c01"}])));

    let failed = client.request(Method::Get, "nodes", None, None);
    assert!(!failed.success);
    assert!(failed.data.is_none());
    assert_eq!(failed.error.as_deref(), Some("no route to host"));
}
