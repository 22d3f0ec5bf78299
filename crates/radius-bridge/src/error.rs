//! Error taxonomy for the bridge
//!
//! Nothing in this enum is allowed to reach FreeRADIUS as a transport
//! failure: every variant is translated into a processing code by the
//! hook layer.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Required attributes missing or unparsable
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
    /// Identity backend did not answer within the configured bound
    #[error("Identity backend timed out after {0:?}")]
    BackendTimeout(Duration),
    /// Connection refused, reset, or otherwise lost before a response
    #[error("Identity backend unreachable: {0}")]
    BackendUnreachable(String),
    /// Backend refused the credential or the account; definitive
    #[error("Identity backend rejected the request{}", .0.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    BackendRejected(Option<String>),
    /// Backend answered with something the bridge cannot interpret
    #[error("Unexpected identity backend response: {0}")]
    BackendResponse(String),
    /// Backend cannot check this kind of credential
    #[error("Unsupported: {0}")]
    Unsupported(String),
    /// Anything else, including panics caught at the hook boundary
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Errors worth one more attempt against the backend
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BridgeError::BackendTimeout(_) | BridgeError::BackendUnreachable(_)
        )
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        BridgeError::MalformedRequest(reason.into())
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
