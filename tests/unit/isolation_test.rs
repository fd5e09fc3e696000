//! Call-isolation tests: many concurrent logical calls sharing one client
//! must each resolve to their own endpoint, never observing a path segment
//! that belongs to another in-flight call.

use std::collections::HashSet;
use std::sync::Arc;

use pve_client::{AsyncPveClient, ClientConfig, PveClient};
use serde_json::json;

use crate::common::mocks::{AsyncEchoBackend, EchoBackend};

/// Distinct 3-5 segment paths, one per worker
fn paths(n: usize) -> Vec<Vec<String>> {
    (0..n)
        .map(|i| {
            let mut segments = vec!["nodes".to_string(), format!("c{i:02}"), "qemu".to_string()];
            if i % 2 == 0 {
                segments.push(format!("{}", 100 + i));
            }
            if i % 3 == 0 {
                segments.push("status".to_string());
            }
            segments
        })
        .collect()
}

#[test]
fn threads_sharing_one_client_build_isolated_paths() {
    let backend = EchoBackend::new();
    let log = backend.log_handle();
    let client = Arc::new(PveClient::with_backend(
        Box::new(backend),
        ClientConfig::default(),
    ));

    let worker_paths = paths(16);
    let handles: Vec<_> = worker_paths
        .iter()
        .cloned()
        .map(|segments| {
            let client = Arc::clone(&client);
            std::thread::spawn(move || {
                let mut call = client.call();
                for segment in &segments {
                    call = call.segment(segment);
                }
                let expected = segments.join("/");
                // The echo backend returns the endpoint it dispatched.
                assert_eq!(call.get(), Some(json!(expected.clone())), "cross-call contamination");
                expected
            })
        })
        .collect();

    let expected: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let seen: HashSet<String> = log
        .lock()
        .unwrap()
        .iter()
        .map(|request| request.endpoint.clone())
        .collect();
    assert_eq!(seen, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tasks_sharing_one_client_build_isolated_paths() {
    let backend = AsyncEchoBackend::new();
    let log = backend.log_handle();
    let client = Arc::new(AsyncPveClient::with_backend(
        Box::new(backend),
        ClientConfig::default(),
    ));

    let worker_paths = paths(16);
    let handles: Vec<_> = worker_paths
        .iter()
        .cloned()
        .map(|segments| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                let mut call = client.call();
                for segment in &segments {
                    call = call.segment(segment);
                }
                let expected = segments.join("/");
                assert_eq!(
                    call.get().await,
                    Some(json!(expected.clone())),
                    "cross-call contamination"
                );
                expected
            })
        })
        .collect();

    let mut expected = HashSet::new();
    for handle in handles {
        expected.insert(handle.await.unwrap());
    }
    let seen: HashSet<String> = log
        .lock()
        .unwrap()
        .iter()
        .map(|request| request.endpoint.clone())
        .collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn interleaved_builders_on_one_task_do_not_share_state() {
    let backend = AsyncEchoBackend::new();
    let client = AsyncPveClient::with_backend(Box::new(backend), ClientConfig::default());

    // Build two chains in lockstep before either executes.
    let a = client.call().segment("nodes").id("c01").segment("status");
    let b = client.call().segment("cluster").segment("ha").segment("groups");

    assert_eq!(a.get().await, Some(json!("nodes/c01/status")));
    assert_eq!(b.get().await, Some(json!("cluster/ha/groups")));
}
