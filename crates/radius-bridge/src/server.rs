//! HTTP hook server
//!
//! Serves the `rlm_rest` phase endpoints FreeRADIUS calls:
//! `POST /authorize`, `POST /authenticate`, `POST /post-auth`, plus
//! `GET /health`. Every phase request is answered; parse failures and
//! handler panics become rejects.

use crate::audit::{AuditEntry, AuditEventType, AuditLogger};
use crate::bridge::Bridge;
use crate::config::{Config, ConfigError};
use crate::error::BridgeError;
use crate::hook::{Phase, PhaseResponse, RadiusHook, dispatch};
use crate::rest;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ipnetwork::IpNetwork;
use serde::Serialize;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

/// Everything the hook server needs to run
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub hook: Arc<dyn RadiusHook>,
    /// Reported by `/health`
    pub backend_name: &'static str,
    /// Callers allowed to use the phase endpoints, empty = any
    pub allowed_clients: Vec<IpNetwork>,
    pub audit_logger: Arc<AuditLogger>,
}

impl ServerConfig {
    /// Create server config, audit logger and bridge from a full Config
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let bind_addr = config.socket_addr()?;
        let allowed_clients = config.client_networks()?;
        let audit_logger = Arc::new(AuditLogger::new(config.audit_log_path.as_ref())?);

        let bridge = Bridge::from_config(config, audit_logger.clone())?;
        let backend_name = bridge.client().backend_name();

        Ok(ServerConfig {
            bind_addr,
            hook: Arc::new(bridge),
            backend_name,
            allowed_clients,
            audit_logger,
        })
    }
}

#[derive(Clone)]
struct AppState {
    hook: Arc<dyn RadiusHook>,
    backend_name: &'static str,
    allowed_clients: Arc<Vec<IpNetwork>>,
    audit: Arc<AuditLogger>,
}

impl AppState {
    fn is_allowed(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.allowed_clients.is_empty() || self.allowed_clients.iter().any(|net| net.contains(ip))
    }
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    backend: &'static str,
    version: &'static str,
}

/// Build the hook router
///
/// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`
/// so the caller address is available for the allow-list.
pub fn router(config: &ServerConfig) -> Router {
    let state = AppState {
        hook: config.hook.clone(),
        backend_name: config.backend_name,
        allowed_clients: Arc::new(config.allowed_clients.clone()),
        audit: config.audit_logger.clone(),
    };

    Router::new()
        .route("/authorize", post(authorize_handler))
        .route("/authenticate", post(authenticate_handler))
        .route("/post-auth", post(post_auth_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn authorize_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Response {
    handle_phase(state, peer, Phase::Authorize, body).await
}

async fn authenticate_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Response {
    handle_phase(state, peer, Phase::Authenticate, body).await
}

async fn post_auth_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Response {
    handle_phase(state, peer, Phase::PostAuth, body).await
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        backend: state.backend_name,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn handle_phase(state: AppState, peer: SocketAddr, phase: Phase, body: Bytes) -> Response {
    // IPv4 callers of a dual-stack listener arrive as ::ffff:a.b.c.d
    let ip = peer.ip().to_canonical();
    if !state.is_allowed(ip) {
        warn!(client_ip = %ip, phase = %phase, "Rejected hook call from unauthorized client");
        state
            .audit
            .log(
                AuditEntry::new(AuditEventType::UnauthorizedClient)
                    .with_client_ip(ip)
                    .with_phase(phase.as_str()),
            )
            .await;
        return StatusCode::FORBIDDEN.into_response();
    }

    let attributes = match rest::parse_attributes(&body) {
        Ok(attributes) => attributes,
        Err(e) => {
            warn!(client_ip = %ip, phase = %phase, error = %e, "Unparsable hook request");
            state
                .audit
                .log(
                    AuditEntry::new(AuditEventType::MalformedRequest)
                        .with_client_ip(ip)
                        .with_phase(phase.as_str())
                        .with_details(e.to_string()),
                )
                .await;
            return respond(PhaseResponse::reject());
        }
    };

    debug!(client_ip = %ip, phase = %phase, attributes = attributes.len(), "Hook request");

    let response = match dispatch(state.hook.clone(), phase, attributes).await {
        Ok(response) => response,
        Err(e) => {
            state
                .audit
                .log(
                    AuditEntry::new(AuditEventType::InternalError)
                        .with_client_ip(ip)
                        .with_phase(phase.as_str())
                        .with_details(e.to_string()),
                )
                .await;
            PhaseResponse::reject()
        }
    };

    respond(response)
}

fn respond(response: PhaseResponse) -> Response {
    let status = rest::status_code(&response);
    match rest::render(&response) {
        Some(body) if status != StatusCode::NO_CONTENT => (status, Json(body)).into_response(),
        _ => status.into_response(),
    }
}

/// Hook server bound to its listen address
pub struct HookServer {
    listener: TcpListener,
    config: ServerConfig,
}

impl HookServer {
    /// Bind the listen address
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        Ok(HookServer { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until Ctrl+C
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` completes, letting in-flight requests finish
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        let app = router(&self.config);

        info!(address = %addr, backend = self.config.backend_name, "Hook server listening");
        self.config
            .audit_logger
            .log(AuditEntry::new(AuditEventType::ServerStart).with_details(format!(
                "listening on {}, backend {}",
                addr, self.config.backend_name
            )))
            .await;

        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("Hook server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(allowed: &[&str]) -> AppState {
        struct Idle;

        #[async_trait::async_trait]
        impl RadiusHook for Idle {
            async fn authorize(&self, _: &radius_proto::AttributeList) -> PhaseResponse {
                PhaseResponse::noop()
            }
            async fn authenticate(&self, _: &radius_proto::AttributeList) -> PhaseResponse {
                PhaseResponse::noop()
            }
            async fn post_auth(&self, _: &radius_proto::AttributeList) -> PhaseResponse {
                PhaseResponse::noop()
            }
        }

        AppState {
            hook: Arc::new(Idle),
            backend_name: "idle",
            allowed_clients: Arc::new(allowed.iter().map(|a| a.parse().unwrap()).collect()),
            audit: Arc::new(AuditLogger::disabled()),
        }
    }

    #[test]
    fn test_empty_allow_list_admits_all() {
        assert!(state(&[]).is_allowed("192.0.2.1".parse().unwrap()));
    }

    #[test]
    fn test_allow_list_matches_ipv4_mapped_callers() {
        let state = state(&["127.0.0.1/32", "10.0.0.0/8"]);
        let mapped: IpAddr = "::ffff:127.0.0.1".parse().unwrap();

        assert!(state.is_allowed(mapped));
        assert!(!state.is_allowed("::ffff:192.168.0.1".parse().unwrap()));
        assert!(state.is_allowed("10.1.2.3".parse().unwrap()));
        assert!(!state.is_allowed("192.168.0.1".parse().unwrap()));
    }
}
