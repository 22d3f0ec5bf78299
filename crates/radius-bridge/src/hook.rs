//! RADIUS phase interface
//!
//! FreeRADIUS calls the bridge once per phase of a request. A
//! [`RadiusHook`] answers each phase with a return code plus the attributes
//! to merge into the reply and control lists.

use crate::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use radius_proto::AttributeList;
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// Processing phase of a FreeRADIUS request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Authorize,
    Authenticate,
    PostAuth,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Authorize, Phase::Authenticate, Phase::PostAuth];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Authorize => "authorize",
            Phase::Authenticate => "authenticate",
            Phase::PostAuth => "post-auth",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Module return code as understood by FreeRADIUS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rcode {
    Ok,
    Updated,
    Reject,
    Fail,
    Noop,
    NotFound,
}

/// Answer to one phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseResponse {
    pub rcode: Rcode,
    pub reply: AttributeList,
    pub control: AttributeList,
}

impl PhaseResponse {
    pub fn new(rcode: Rcode) -> Self {
        PhaseResponse {
            rcode,
            reply: AttributeList::new(),
            control: AttributeList::new(),
        }
    }

    pub fn reject() -> Self {
        Self::new(Rcode::Reject)
    }

    pub fn fail() -> Self {
        Self::new(Rcode::Fail)
    }

    pub fn noop() -> Self {
        Self::new(Rcode::Noop)
    }

    pub fn with_reply(mut self, reply: AttributeList) -> Self {
        self.reply = reply;
        self
    }

    pub fn with_control(mut self, control: AttributeList) -> Self {
        self.control = control;
        self
    }

    pub fn has_attributes(&self) -> bool {
        !self.reply.is_empty() || !self.control.is_empty()
    }
}

/// Phase handler trait
///
/// Implementations must answer every call; a failure to reach a decision
/// is expressed as [`Rcode::Fail`] or [`Rcode::Reject`], never as a panic.
#[async_trait]
pub trait RadiusHook: Send + Sync {
    /// Decide how the request is authenticated
    async fn authorize(&self, request: &AttributeList) -> PhaseResponse;

    /// Verify the presented credential
    async fn authenticate(&self, request: &AttributeList) -> PhaseResponse;

    /// Observe the final decision
    async fn post_auth(&self, request: &AttributeList) -> PhaseResponse;
}

/// Run one phase on its own task
///
/// A panic inside the handler surfaces as [`BridgeError::Internal`] instead
/// of taking the caller down with it.
pub async fn dispatch(
    hook: Arc<dyn RadiusHook>,
    phase: Phase,
    request: AttributeList,
) -> BridgeResult<PhaseResponse> {
    let task = tokio::spawn(async move {
        match phase {
            Phase::Authorize => hook.authorize(&request).await,
            Phase::Authenticate => hook.authenticate(&request).await,
            Phase::PostAuth => hook.post_auth(&request).await,
        }
    });

    task.await.map_err(|e| {
        error!(phase = %phase, error = %e, "Phase handler aborted");
        BridgeError::Internal(format!("{} handler aborted", phase))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingHook;

    #[async_trait]
    impl RadiusHook for PanickingHook {
        async fn authorize(&self, _request: &AttributeList) -> PhaseResponse {
            PhaseResponse::noop()
        }

        async fn authenticate(&self, _request: &AttributeList) -> PhaseResponse {
            panic!("handler bug");
        }

        async fn post_auth(&self, request: &AttributeList) -> PhaseResponse {
            let mut reply = AttributeList::new();
            reply.push("Reply-Message", format!("{} attributes", request.len()));
            PhaseResponse::new(Rcode::Updated).with_reply(reply)
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_phase() {
        let hook: Arc<dyn RadiusHook> = Arc::new(PanickingHook);

        let response = dispatch(hook.clone(), Phase::Authorize, AttributeList::new())
            .await
            .unwrap();
        assert_eq!(response.rcode, Rcode::Noop);
        assert!(!response.has_attributes());

        let request: AttributeList = vec![("User-Name", "alice")].into_iter().collect();
        let response = dispatch(hook, Phase::PostAuth, request).await.unwrap();
        assert_eq!(response.rcode, Rcode::Updated);
        assert_eq!(response.reply.first("Reply-Message"), Some("1 attributes"));
    }

    #[tokio::test]
    async fn test_dispatch_contains_panic() {
        let hook: Arc<dyn RadiusHook> = Arc::new(PanickingHook);
        let result = dispatch(hook, Phase::Authenticate, AttributeList::new()).await;
        assert!(matches!(result, Err(BridgeError::Internal(_))));
    }

    #[test]
    fn test_phase_names() {
        let names: Vec<&str> = Phase::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["authorize", "authenticate", "post-auth"]);
        assert_eq!(Phase::PostAuth.to_string(), "post-auth");
    }
}
