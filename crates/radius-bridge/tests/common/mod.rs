//! In-process identity service used by the integration tests
//!
//! Accounts: alice/correct-horse in admins, bob/hunter2 with no groups.
//! `slow` never answers in time, `broken` gets a 500, `locked` a 403.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use radius_bridge::{BackendConfig, BackendKind};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

pub const SERVICE_TOKEN: &str = "test-token";

#[derive(Clone, Default)]
pub struct Counters {
    pub verify: Arc<AtomicUsize>,
    pub token: Arc<AtomicUsize>,
}

impl Counters {
    pub fn verify_calls(&self) -> usize {
        self.verify.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.token.load(Ordering::SeqCst)
    }
}

pub struct MockIdentity {
    pub addr: SocketAddr,
    pub counters: Counters,
}

impl MockIdentity {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn backend(&self, kind: BackendKind) -> BackendConfig {
        BackendConfig {
            kind,
            url: self.url(),
            token: Some(SERVICE_TOKEN.to_string()),
            timeout_ms: 300,
            max_retries: 1,
            retry_backoff_ms: 0,
            ..BackendConfig::default()
        }
    }
}

fn account(username: &str) -> Option<(&'static str, &'static [&'static str])> {
    match username {
        "alice" => Some(("correct-horse", &["admins"])),
        "bob" => Some(("hunter2", &[])),
        _ => None,
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", SERVICE_TOKEN))
}

async fn verify_handler(
    State(counters): State<Counters>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    counters.verify.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let username = body["username"].as_str().unwrap_or_default();
    let secret = body["secret"]
        .as_str()
        .and_then(|s| STANDARD.decode(s).ok())
        .unwrap_or_default();

    match username {
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            return StatusCode::NO_CONTENT.into_response();
        }
        "broken" => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "locked" => return StatusCode::FORBIDDEN.into_response(),
        _ => {}
    }

    match account(username) {
        Some((password, groups)) if password.as_bytes() == secret.as_slice() => {
            Json(json!({"outcome": "accept", "groups": groups})).into_response()
        }
        _ => Json(json!({"outcome": "reject", "detail": "invalid credentials"})).into_response(),
    }
}

async fn token_handler(
    State(counters): State<Counters>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    counters.token.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }

    match account(&name) {
        Some((secret, groups)) => {
            let groups: Vec<Value> = groups
                .iter()
                .map(|g| {
                    json!({
                        "spn": format!("{}@idm.example.com", g),
                        "uuid": "00000000-0000-0000-0000-000000000001",
                    })
                })
                .collect();
            Json(json!({
                "name": name,
                "displayname": name.to_uppercase(),
                "uuid": "00000000-0000-0000-0000-0000000000aa",
                "secret": secret,
                "groups": groups,
            }))
            .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start the identity service on an ephemeral port
pub async fn spawn_identity_service() -> MockIdentity {
    let counters = Counters::default();
    let app = Router::new()
        .route("/v1/radius/verify", post(verify_handler))
        .route("/v1/account/{name}/_radius/_token", get(token_handler))
        .with_state(counters.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockIdentity { addr, counters }
}

/// Listener that accepts connections and closes them without answering
pub async fn spawn_dropping_listener() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);
        }
    });

    (addr, accepted)
}
