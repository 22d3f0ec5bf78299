//! FreeRADIUS identity bridge
//!
//! Lets a FreeRADIUS deployment authenticate users against an HTTP identity
//! service. FreeRADIUS calls the bridge through `rlm_rest` for the
//! authorize, authenticate and post-auth phases; the bridge turns the
//! request attributes into an [`AuthRequest`], asks the identity backend
//! through an [`IdentityClient`] (bounded timeout, one retry on transport
//! failures) and translates the answer into reply attributes.
//!
//! # Example
//!
//! ```rust,no_run
//! use radius_bridge::{Config, HookServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.backend.url = "https://idm.example.com".to_string();
//!     config.backend.token = Some("service-token".to_string());
//!
//!     let server = HookServer::new(ServerConfig::from_config(&config)?).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod backend;
pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod hook;
pub mod policy;
pub mod request;
pub mod rest;
pub mod server;
pub mod translate;

pub use audit::{AuditEntry, AuditEventType, AuditLogger};
pub use backend::{
    CredentialRecord, HttpVerifyBackend, IdentityBackend, Lookup, RadiusTokenBackend, Verdict,
};
pub use bridge::Bridge;
pub use client::{BackendResult, IdentityClient, Outcome, RetryPolicy};
pub use config::{BackendConfig, BackendKind, Config, ConfigError, ConfigOverrides};
pub use error::{BridgeError, BridgeResult};
pub use hook::{Phase, PhaseResponse, RadiusHook, Rcode, dispatch};
pub use policy::AccessPolicy;
pub use request::{AuthRequest, Protocol};
pub use server::{HookServer, ServerConfig, ServerError};
pub use translate::{Reply, ReplyAttributes, ReplyMapping, translate};
