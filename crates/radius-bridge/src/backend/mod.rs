//! Identity backend wire contracts
//!
//! The bridge does not assume one identity service API. A backend is
//! anything that can answer "is this credential valid for this user" and,
//! optionally, hand out the user's RADIUS secret so FreeRADIUS can run the
//! challenge-response protocols itself. Timeouts and retries are applied
//! uniformly on top of any backend by [`crate::client::IdentityClient`].

pub mod http;
pub mod token;

use crate::config::{BackendConfig, BackendKind};
use crate::error::{BridgeError, BridgeResult};
use crate::request::AuthRequest;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

pub use http::HttpVerifyBackend;
pub use token::RadiusTokenBackend;

/// Decision returned by a backend for one credential check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept { groups: BTreeSet<String> },
    Reject { detail: Option<String> },
}

/// Account data for backends that release the RADIUS secret
#[derive(Clone)]
pub struct CredentialRecord {
    pub username: String,
    pub secret: Zeroizing<String>,
    pub groups: BTreeSet<String>,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("groups", &self.groups)
            .finish()
    }
}

/// Result of a credential lookup
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(CredentialRecord),
    NotFound,
    /// Backend only verifies; it never releases secrets
    Unsupported,
}

/// Identity backend interface
///
/// Implementations perform exactly one network exchange per call and keep
/// no per-request state; the same instance serves all hook workers.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Short name for logs and the health endpoint
    fn name(&self) -> &'static str;

    /// Check a presented credential
    ///
    /// Return `Err(BridgeError::BackendRejected)` or `Ok(Verdict::Reject)`
    /// for definitive refusals; transport failures must map to
    /// `BackendUnreachable`/`BackendTimeout` so they can be retried.
    async fn verify(&self, request: &AuthRequest) -> BridgeResult<Verdict>;

    /// Fetch the account's RADIUS secret and groups
    async fn lookup(&self, _username: &str) -> BridgeResult<Lookup> {
        Ok(Lookup::Unsupported)
    }
}

/// Build the backend selected in configuration
pub fn from_config(config: &BackendConfig) -> BridgeResult<Arc<dyn IdentityBackend>> {
    let backend: Arc<dyn IdentityBackend> = match config.kind {
        BackendKind::Verify => Arc::new(HttpVerifyBackend::new(config)?),
        BackendKind::RadiusToken => Arc::new(RadiusTokenBackend::new(config)?),
    };
    Ok(backend)
}

/// HTTP client shared by the HTTP-based backends
///
/// `reqwest::Client` pools connections internally and is safe to share
/// between concurrent requests.
pub(crate) fn http_client(config: &BackendConfig) -> BridgeResult<reqwest::Client> {
    let timeout = config.timeout();
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(concat!("radius-bridge/", env!("CARGO_PKG_VERSION")));

    if !config.verify_tls {
        tracing::warn!("TLS certificate verification disabled for identity backend");
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some(ref path) = config.ca_path {
        let pem = std::fs::read(path)
            .map_err(|e| BridgeError::Internal(format!("Cannot read CA bundle {}: {}", path, e)))?;
        let cert = reqwest::Certificate::from_pem(&pem)
            .map_err(|e| BridgeError::Internal(format!("Invalid CA bundle {}: {}", path, e)))?;
        builder = builder.add_root_certificate(cert);
    }

    builder
        .build()
        .map_err(|e| BridgeError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Classify a reqwest failure
///
/// Connect failures, resets while sending or reading, and timeouts are
/// transient. Anything else means the backend answered with something we
/// cannot use.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> BridgeError {
    if err.is_timeout() {
        BridgeError::BackendTimeout(timeout)
    } else if err.is_connect() || err.is_request() || err.is_body() {
        BridgeError::BackendUnreachable(err.to_string())
    } else {
        BridgeError::BackendResponse(err.to_string())
    }
}

/// Base URL without a trailing slash
pub(crate) fn base_url(config: &BackendConfig) -> BridgeResult<reqwest::Url> {
    let mut url = reqwest::Url::parse(config.url.trim_end_matches('/'))
        .map_err(|e| BridgeError::Internal(format!("Invalid backend URL {}: {}", config.url, e)))?;
    if url.cannot_be_a_base() {
        return Err(BridgeError::Internal(format!(
            "Backend URL cannot be a base: {}",
            config.url
        )));
    }
    url.set_query(None);
    Ok(url)
}

/// Append path segments to a base URL, percent-encoding each one
///
/// `.` and `..` are refused: the URL parser would resolve them away and
/// address a different resource.
pub(crate) fn join_segments(base: &reqwest::Url, segments: &[&str]) -> BridgeResult<reqwest::Url> {
    if let Some(dot) = segments.iter().find(|s| **s == "." || **s == "..") {
        return Err(BridgeError::malformed(format!("invalid path segment {:?}", dot)));
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| BridgeError::Internal(format!("Backend URL cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
