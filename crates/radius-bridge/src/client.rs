//! Identity backend client
//!
//! Wraps any [`IdentityBackend`] with the call policy: every attempt is
//! bounded by a timeout, transient transport failures get a bounded number
//! of retries, and definitive refusals are never retried. The result is
//! always a [`BackendResult`]; errors do not escape.

use crate::backend::{IdentityBackend, Lookup, Verdict};
use crate::config::BackendConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::request::AuthRequest;
use serde::Serialize;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of one credential verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Accept,
    Reject,
    Error,
}

/// What the bridge learned from the backend for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendResult {
    pub outcome: Outcome,
    pub groups: BTreeSet<String>,
    pub error_detail: Option<String>,
}

impl BackendResult {
    pub fn accept(groups: impl IntoIterator<Item = String>) -> Self {
        BackendResult {
            outcome: Outcome::Accept,
            groups: groups.into_iter().collect(),
            error_detail: None,
        }
    }

    pub fn reject(detail: Option<String>) -> Self {
        BackendResult {
            outcome: Outcome::Reject,
            groups: BTreeSet::new(),
            error_detail: detail,
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        BackendResult {
            outcome: Outcome::Error,
            groups: BTreeSet::new(),
            error_detail: Some(detail.into()),
        }
    }
}

/// Timeout and retry settings for backend calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Bound on a single attempt
    pub timeout: Duration,
    /// Extra attempts after a transient failure
    pub max_retries: u8,
    /// Pause before each retry
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            timeout: Duration::from_secs(5),
            max_retries: 1,
            backoff: Duration::from_millis(100),
        }
    }
}

impl From<&BackendConfig> for RetryPolicy {
    fn from(config: &BackendConfig) -> Self {
        RetryPolicy {
            timeout: config.timeout(),
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

pub struct IdentityClient {
    backend: Arc<dyn IdentityBackend>,
    policy: RetryPolicy,
}

impl IdentityClient {
    pub fn new(backend: Arc<dyn IdentityBackend>, policy: RetryPolicy) -> Self {
        IdentityClient { backend, policy }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Verify a credential; always produces exactly one result
    pub async fn verify(&self, request: &AuthRequest) -> BackendResult {
        match self.call(|| self.backend.verify(request)).await {
            Ok(Verdict::Accept { groups }) => BackendResult::accept(groups),
            Ok(Verdict::Reject { detail }) => BackendResult::reject(detail),
            Err(BridgeError::BackendRejected(detail)) => BackendResult::reject(detail),
            Err(e) => BackendResult::error(e.to_string()),
        }
    }

    /// Fetch the account's RADIUS secret under the same call policy
    pub async fn lookup(&self, username: &str) -> BridgeResult<Lookup> {
        self.call(|| self.backend.lookup(username)).await
    }

    async fn call<T, F, Fut>(&self, op: F) -> BridgeResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = BridgeResult<T>>,
    {
        let mut attempt: u8 = 0;
        loop {
            let result = match tokio::time::timeout(self.policy.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(BridgeError::BackendTimeout(self.policy.timeout)),
            };

            match result {
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    warn!(
                        backend = self.backend.name(),
                        attempt = attempt,
                        error = %e,
                        "Transient identity backend failure, retrying"
                    );
                    if !self.policy.backoff.is_zero() {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
                Err(e) => {
                    debug!(backend = self.backend.name(), error = %e, "Identity backend call failed");
                    return Err(e);
                }
                Ok(value) => return Ok(value),
            }
        }
    }
}
