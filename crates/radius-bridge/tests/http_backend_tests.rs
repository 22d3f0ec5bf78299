//! Identity client against a live HTTP verification service
//!
//! Covers the wire contract of the verify backend and the timeout/retry
//! policy applied on top of it.

mod common;

use common::{spawn_dropping_listener, spawn_identity_service};
use radius_bridge::backend::{self, HttpVerifyBackend};
use radius_bridge::{
    AuthRequest, BackendConfig, BackendKind, IdentityBackend, IdentityClient, Outcome, RetryPolicy,
};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

fn client_for(config: &BackendConfig) -> IdentityClient {
    let backend = backend::from_config(config).unwrap();
    IdentityClient::new(backend, RetryPolicy::from(config))
}

#[tokio::test]
async fn test_accept_with_groups() {
    let idm = spawn_identity_service().await;
    let client = client_for(&idm.backend(BackendKind::Verify));

    let result = client
        .verify(&AuthRequest::pap("alice", "correct-horse"))
        .await;
    assert_eq!(result.outcome, Outcome::Accept);
    assert_eq!(result.groups.iter().collect::<Vec<_>>(), vec!["admins"]);
    assert_eq!(idm.counters.verify_calls(), 1);
}

#[tokio::test]
async fn test_wrong_password_rejected_once() {
    let idm = spawn_identity_service().await;
    let client = client_for(&idm.backend(BackendKind::Verify));

    let result = client.verify(&AuthRequest::pap("bob", "wrong")).await;
    assert_eq!(result.outcome, Outcome::Reject);
    assert_eq!(result.error_detail.as_deref(), Some("invalid credentials"));
    assert_eq!(idm.counters.verify_calls(), 1);
}

#[tokio::test]
async fn test_forbidden_is_definitive_reject() {
    let idm = spawn_identity_service().await;
    let client = client_for(&idm.backend(BackendKind::Verify));

    let result = client.verify(&AuthRequest::pap("locked", "x")).await;
    assert_eq!(result.outcome, Outcome::Reject);
    assert_eq!(idm.counters.verify_calls(), 1);
}

#[tokio::test]
async fn test_bad_service_token_rejected() {
    let idm = spawn_identity_service().await;
    let mut config = idm.backend(BackendKind::Verify);
    config.token = Some("wrong-token".to_string());
    let client = client_for(&config);

    let result = client
        .verify(&AuthRequest::pap("alice", "correct-horse"))
        .await;
    assert_eq!(result.outcome, Outcome::Reject);
    assert_eq!(result.error_detail.as_deref(), Some("HTTP 401"));
}

#[tokio::test]
async fn test_server_error_not_retried() {
    let idm = spawn_identity_service().await;
    let client = client_for(&idm.backend(BackendKind::Verify));

    let result = client.verify(&AuthRequest::pap("broken", "x")).await;
    assert_eq!(result.outcome, Outcome::Error);
    assert!(result.error_detail.unwrap().contains("500"));
    assert_eq!(idm.counters.verify_calls(), 1);
}

#[tokio::test]
async fn test_slow_backend_times_out_after_one_retry() {
    let idm = spawn_identity_service().await;
    let client = client_for(&idm.backend(BackendKind::Verify));

    let started = Instant::now();
    let result = client.verify(&AuthRequest::pap("slow", "x")).await;
    assert_eq!(result.outcome, Outcome::Error);
    assert!(result.groups.is_empty());
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(idm.counters.verify_calls(), 2);
}

#[tokio::test]
async fn test_dropped_connections_tried_twice() {
    let (addr, accepted) = spawn_dropping_listener().await;
    let config = BackendConfig {
        url: format!("http://{}", addr),
        timeout_ms: 500,
        max_retries: 1,
        retry_backoff_ms: 0,
        ..BackendConfig::default()
    };
    let client = client_for(&config);

    let result = client
        .verify(&AuthRequest::pap("alice", "correct-horse"))
        .await;
    assert_eq!(result.outcome, Outcome::Error);
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_refused_connection_is_error() {
    // Bind then release a port so nothing listens there
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let config = BackendConfig {
        url: format!("http://{}", addr),
        timeout_ms: 500,
        retry_backoff_ms: 0,
        ..BackendConfig::default()
    };
    let client = client_for(&config);

    let result = client.verify(&AuthRequest::pap("alice", "pw")).await;
    assert_eq!(result.outcome, Outcome::Error);
    assert!(result.error_detail.is_some());
}

#[tokio::test]
async fn test_endpoint_respects_base_path() {
    let config = BackendConfig {
        url: "https://idm.example.com/api/".to_string(),
        ..BackendConfig::default()
    };
    let backend = HttpVerifyBackend::new(&config).unwrap();
    assert_eq!(
        backend.endpoint().as_str(),
        "https://idm.example.com/api/v1/radius/verify"
    );
    assert_eq!(backend.name(), "verify");
}
