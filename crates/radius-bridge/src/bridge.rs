//! The bridge: adapter, identity client, access policy and translator
//! wired behind the [`RadiusHook`] phases.

use crate::audit::{AuditEntry, AuditEventType, AuditLogger};
use crate::backend::{self, Lookup};
use crate::client::{BackendResult, IdentityClient, Outcome};
use crate::config::Config;
use crate::error::{BridgeError, BridgeResult};
use crate::hook::{Phase, PhaseResponse, RadiusHook, Rcode};
use crate::policy::AccessPolicy;
use crate::request::{AuthRequest, extract_username};
use crate::translate::{Reply, ReplyMapping, translate};
use async_trait::async_trait;
use radius_proto::{AttributeList, AttributeType, internal};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct Bridge {
    client: IdentityClient,
    mapping: ReplyMapping,
    policy: AccessPolicy,
    auth_type: String,
    audit: Arc<AuditLogger>,
}

impl Bridge {
    pub fn new(
        client: IdentityClient,
        mapping: ReplyMapping,
        policy: AccessPolicy,
        auth_type: impl Into<String>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Bridge {
            client,
            mapping,
            policy,
            auth_type: auth_type.into(),
            audit,
        }
    }

    /// Build the backend named in the configuration and wire it up
    pub fn from_config(config: &Config, audit: Arc<AuditLogger>) -> BridgeResult<Self> {
        let backend = backend::from_config(&config.backend)?;
        let client = IdentityClient::new(backend, config.retry_policy());
        Ok(Bridge::new(
            client,
            config.reply.clone(),
            AccessPolicy::new(config.required_groups.clone()),
            config.auth_type.clone(),
            audit,
        ))
    }

    pub fn client(&self) -> &IdentityClient {
        &self.client
    }

    /// Verify a request and translate the result
    ///
    /// Always yields exactly one result and one reply.
    pub async fn evaluate(&self, request: &AuthRequest) -> (BackendResult, Reply) {
        let result = self.policy.apply(self.client.verify(request).await);
        let reply = translate(&result, &self.mapping);
        (result, reply)
    }

    async fn audit_malformed(&self, phase: Phase, attrs: &AttributeList, error: &BridgeError) {
        warn!(phase = %phase, error = %error, "Malformed request");
        let mut entry = AuditEntry::new(AuditEventType::MalformedRequest)
            .with_phase(phase.as_str())
            .with_nas(nas_of(attrs))
            .with_details(error.to_string());
        if let Ok(username) = extract_username(attrs) {
            entry = entry.with_username(username);
        }
        self.audit.log(entry).await;
    }

    async fn audit_decision(
        &self,
        event: AuditEventType,
        phase: Phase,
        username: Option<&str>,
        attrs: &AttributeList,
        details: Option<&str>,
    ) {
        let mut entry = AuditEntry::new(event)
            .with_phase(phase.as_str())
            .with_nas(nas_of(attrs));
        if let Some(username) = username {
            entry = entry.with_username(username);
        }
        if let Some(details) = details {
            entry = entry.with_details(details);
        }
        self.audit.log(entry).await;
    }
}

fn nas_of(attrs: &AttributeList) -> Option<&str> {
    attrs
        .get(AttributeType::NasIdentifier)
        .or_else(|| attrs.get(AttributeType::NasIpAddress))
}

#[async_trait]
impl RadiusHook for Bridge {
    async fn authorize(&self, attrs: &AttributeList) -> PhaseResponse {
        let phase = Phase::Authorize;
        let username = match extract_username(attrs) {
            Ok(username) => username,
            Err(e) => {
                self.audit_malformed(phase, attrs, &e).await;
                return PhaseResponse::reject();
            }
        };

        match self.client.lookup(&username).await {
            Ok(Lookup::Unsupported) => {
                debug!(username = %username, auth_type = %self.auth_type, "Routing authentication to bridge");
                let mut control = AttributeList::new();
                control.push(internal::AUTH_TYPE, self.auth_type.clone());
                PhaseResponse::new(Rcode::Updated).with_control(control)
            }
            Ok(Lookup::NotFound) => {
                info!(username = %username, "Unknown account");
                self.audit_decision(AuditEventType::AuthFailure, phase, Some(username.as_str()), attrs, Some("unknown account"))
                    .await;
                PhaseResponse::new(Rcode::NotFound)
            }
            Ok(Lookup::Found(record)) => {
                let result = self
                    .policy
                    .apply(BackendResult::accept(record.groups.iter().cloned()));
                if result.outcome != Outcome::Accept {
                    info!(username = %username, "Account lacks a required group");
                    self.audit_decision(
                        AuditEventType::AuthFailure,
                        phase,
                        Some(username.as_str()),
                        attrs,
                        result.error_detail.as_deref(),
                    )
                    .await;
                    return PhaseResponse::reject();
                }

                let reply = translate(&result, &self.mapping);
                let mut control = AttributeList::new();
                control.push(internal::CLEARTEXT_PASSWORD, record.secret.as_str());
                debug!(username = %username, attributes = reply.attributes.len(), "Released credential to FreeRADIUS");
                PhaseResponse::new(Rcode::Updated)
                    .with_reply(reply.attributes.into_iter().collect())
                    .with_control(control)
            }
            Err(BridgeError::BackendRejected(detail)) => {
                warn!(username = %username, "Identity backend refused the lookup");
                self.audit_decision(AuditEventType::AuthFailure, phase, Some(username.as_str()), attrs, detail.as_deref())
                    .await;
                PhaseResponse::reject()
            }
            Err(e) => {
                error!(username = %username, backend = self.client.backend_name(), error = %e, "Credential lookup failed");
                let detail = e.to_string();
                self.audit_decision(AuditEventType::BackendError, phase, Some(username.as_str()), attrs, Some(detail.as_str()))
                    .await;
                PhaseResponse::fail()
            }
        }
    }

    async fn authenticate(&self, attrs: &AttributeList) -> PhaseResponse {
        let phase = Phase::Authenticate;
        let request = match AuthRequest::from_attributes(attrs) {
            Ok(request) => request,
            Err(e) => {
                self.audit_malformed(phase, attrs, &e).await;
                return PhaseResponse::reject();
            }
        };

        self.audit
            .log(
                AuditEntry::new(AuditEventType::AuthAttempt)
                    .with_phase(phase.as_str())
                    .with_username(request.username.clone())
                    .with_protocol(request.protocol_hint.as_str())
                    .with_nas(nas_of(attrs)),
            )
            .await;

        let (result, reply) = self.evaluate(&request).await;
        let entry = AuditEntry::new(AuditEventType::AuthSuccess)
            .with_phase(phase.as_str())
            .with_username(request.username.clone())
            .with_protocol(request.protocol_hint.as_str())
            .with_nas(nas_of(attrs));

        match result.outcome {
            Outcome::Accept => {
                info!(username = %request.username, protocol = %request.protocol_hint, "Authentication accepted");
                self.audit.log(entry).await;
                let rcode = if reply.attributes.is_empty() {
                    Rcode::Ok
                } else {
                    Rcode::Updated
                };
                PhaseResponse::new(rcode).with_reply(reply.attributes.into_iter().collect())
            }
            Outcome::Reject => {
                info!(username = %request.username, protocol = %request.protocol_hint, "Authentication rejected");
                let mut entry = entry;
                entry.event_type = AuditEventType::AuthFailure;
                entry.details = result.error_detail;
                self.audit.log(entry).await;
                PhaseResponse::reject()
            }
            Outcome::Error => {
                let detail = result.error_detail.unwrap_or_default();
                error!(
                    username = %request.username,
                    backend = self.client.backend_name(),
                    error = %detail,
                    "Identity backend unavailable"
                );
                let mut entry = entry;
                entry.event_type = AuditEventType::BackendError;
                entry.details = Some(detail);
                self.audit.log(entry).await;
                PhaseResponse::fail()
            }
        }
    }

    async fn post_auth(&self, attrs: &AttributeList) -> PhaseResponse {
        let phase = Phase::PostAuth;
        let username = extract_username(attrs).ok();
        let post_auth_type = attrs.first(internal::POST_AUTH_TYPE);

        let event = match post_auth_type {
            Some(kind) if kind.eq_ignore_ascii_case("reject") => AuditEventType::AuthFailure,
            _ => AuditEventType::AuthSuccess,
        };
        let details = post_auth_type.map(|kind| format!("{} {}", internal::POST_AUTH_TYPE, kind));

        debug!(username = ?username, event = ?event, "Post-auth");
        self.audit_decision(event, phase, username.as_deref(), attrs, details.as_deref())
            .await;
        PhaseResponse::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CredentialRecord, IdentityBackend, Verdict};
    use crate::client::RetryPolicy;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use zeroize::Zeroizing;

    /// In-memory directory: alice/correct-horse in admins, bob/hunter2 with no groups
    struct Directory {
        calls: AtomicUsize,
        releases_secrets: bool,
        unreachable: bool,
    }

    impl Directory {
        fn new() -> Arc<Self> {
            Arc::new(Directory {
                calls: AtomicUsize::new(0),
                releases_secrets: false,
                unreachable: false,
            })
        }

        fn record(username: &str) -> Option<CredentialRecord> {
            let (secret, groups): (&str, &[&str]) = match username {
                "alice" => ("correct-horse", &["admins"]),
                "bob" => ("hunter2", &[]),
                _ => return None,
            };
            Some(CredentialRecord {
                username: username.to_string(),
                secret: Zeroizing::new(secret.to_string()),
                groups: groups.iter().map(|g| g.to_string()).collect(),
            })
        }
    }

    #[async_trait]
    impl IdentityBackend for Directory {
        fn name(&self) -> &'static str {
            "directory"
        }

        async fn verify(&self, request: &AuthRequest) -> BridgeResult<Verdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unreachable {
                return Err(BridgeError::BackendUnreachable("connection refused".into()));
            }
            match Directory::record(&request.username) {
                Some(record) if record.secret.as_bytes() == request.presented_secret.as_slice() => {
                    Ok(Verdict::Accept {
                        groups: record.groups,
                    })
                }
                _ => Ok(Verdict::Reject {
                    detail: Some("invalid credentials".into()),
                }),
            }
        }

        async fn lookup(&self, username: &str) -> BridgeResult<Lookup> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.releases_secrets {
                return Ok(Lookup::Unsupported);
            }
            Ok(Directory::record(username).map_or(Lookup::NotFound, Lookup::Found))
        }
    }

    fn bridge_with(directory: Arc<Directory>, audit: Arc<AuditLogger>, required: &[&str]) -> Bridge {
        let policy = RetryPolicy {
            timeout: Duration::from_millis(200),
            max_retries: 1,
            backoff: Duration::ZERO,
        };
        Bridge::new(
            IdentityClient::new(directory, policy),
            ReplyMapping::default(),
            AccessPolicy::new(required.iter().map(|g| g.to_string()).collect()),
            "idm",
            audit,
        )
    }

    fn bridge(directory: Arc<Directory>) -> Bridge {
        bridge_with(directory, Arc::new(AuditLogger::disabled()), &[])
    }

    fn pap(username: &str, password: &str) -> AttributeList {
        vec![
            ("User-Name", username),
            ("User-Password", password),
            ("NAS-Identifier", "switch-01"),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_alice_accepted_with_filter_id() {
        let bridge = bridge(Directory::new());
        let response = bridge.authenticate(&pap("alice", "correct-horse")).await;

        assert_eq!(response.rcode, Rcode::Updated);
        assert_eq!(response.reply.first("Filter-Id"), Some("admins"));
        assert!(response.control.is_empty());
    }

    #[tokio::test]
    async fn test_accept_without_groups_is_ok() {
        let bridge = bridge(Directory::new());
        let response = bridge.authenticate(&pap("bob", "hunter2")).await;
        assert_eq!(response.rcode, Rcode::Ok);
        assert!(!response.has_attributes());
    }

    #[tokio::test]
    async fn test_bob_wrong_password_rejected() {
        let bridge = bridge(Directory::new());
        let response = bridge.authenticate(&pap("bob", "wrong")).await;
        assert_eq!(response.rcode, Rcode::Reject);
        assert!(response.reply.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_request_never_reaches_backend() {
        let directory = Directory::new();
        let bridge = bridge(directory.clone());

        let no_user: AttributeList = vec![("User-Password", "x")].into_iter().collect();
        let no_credential: AttributeList = vec![("User-Name", "alice")].into_iter().collect();

        assert_eq!(bridge.authenticate(&no_user).await.rcode, Rcode::Reject);
        assert_eq!(bridge.authenticate(&no_credential).await.rcode, Rcode::Reject);
        assert_eq!(bridge.authorize(&no_user).await.rcode, Rcode::Reject);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_after_retry() {
        let directory = Arc::new(Directory {
            calls: AtomicUsize::new(0),
            releases_secrets: false,
            unreachable: true,
        });
        let bridge = bridge(directory.clone());

        let response = bridge.authenticate(&pap("alice", "correct-horse")).await;
        assert_eq!(response.rcode, Rcode::Fail);
        assert!(response.reply.is_empty());
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_required_group_enforced() {
        let bridge = bridge_with(Directory::new(), Arc::new(AuditLogger::disabled()), &["admins"]);
        assert_eq!(bridge.authenticate(&pap("bob", "hunter2")).await.rcode, Rcode::Reject);
        assert_eq!(
            bridge.authenticate(&pap("alice", "correct-horse")).await.rcode,
            Rcode::Updated
        );
    }

    #[tokio::test]
    async fn test_repeated_requests_get_identical_answers() {
        let bridge = bridge(Directory::new());
        let request = pap("alice", "correct-horse");
        let first = bridge.authenticate(&request).await;
        let second = bridge.authenticate(&request).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_evaluate_is_total() {
        let bridge = bridge(Directory::new());
        let (result, reply) = bridge.evaluate(&AuthRequest::pap("mallory", "x")).await;
        assert_eq!(result.outcome, Outcome::Reject);
        assert!(!reply.accept);
        assert!(reply.attributes.is_empty());
    }

    #[tokio::test]
    async fn test_authorize_routes_to_bridge() {
        let bridge = bridge(Directory::new());
        let request: AttributeList = vec![("User-Name", "alice")].into_iter().collect();
        let response = bridge.authorize(&request).await;

        assert_eq!(response.rcode, Rcode::Updated);
        assert_eq!(response.control.first("Auth-Type"), Some("idm"));
        assert!(response.reply.is_empty());
    }

    #[tokio::test]
    async fn test_authorize_releases_secret() {
        let directory = Arc::new(Directory {
            calls: AtomicUsize::new(0),
            releases_secrets: true,
            unreachable: false,
        });
        let bridge = bridge(directory);

        let request: AttributeList = vec![("User-Name", "alice")].into_iter().collect();
        let response = bridge.authorize(&request).await;
        assert_eq!(response.rcode, Rcode::Updated);
        assert_eq!(response.control.first("Cleartext-Password"), Some("correct-horse"));
        assert_eq!(response.reply.first("Filter-Id"), Some("admins"));

        let request: AttributeList = vec![("User-Name", "mallory")].into_iter().collect();
        assert_eq!(bridge.authorize(&request).await.rcode, Rcode::NotFound);
    }

    #[tokio::test]
    async fn test_audit_trail() {
        let file = NamedTempFile::new().unwrap();
        let audit = Arc::new(AuditLogger::new(Some(file.path())).unwrap());
        let bridge = bridge_with(Directory::new(), audit, &[]);

        bridge.authenticate(&pap("alice", "correct-horse")).await;
        bridge.authenticate(&pap("bob", "wrong")).await;
        let mut post: AttributeList = pap("bob", "wrong");
        post.push("Post-Auth-Type", "REJECT");
        assert_eq!(bridge.post_auth(&post).await.rcode, Rcode::Noop);

        let contents = fs::read_to_string(file.path()).unwrap();
        let events: Vec<AuditEntry> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let kinds: Vec<AuditEventType> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            kinds,
            vec![
                AuditEventType::AuthAttempt,
                AuditEventType::AuthSuccess,
                AuditEventType::AuthAttempt,
                AuditEventType::AuthFailure,
                AuditEventType::AuthFailure,
            ]
        );
        assert_eq!(events[1].nas.as_deref(), Some("switch-01"));
        assert_eq!(events[4].phase.as_deref(), Some("post-auth"));
        assert!(!contents.contains("correct-horse"));
        assert!(!contents.contains("wrong"));
    }

    #[tokio::test]
    async fn test_post_auth_without_username_omits_it() {
        let file = NamedTempFile::new().unwrap();
        let audit = Arc::new(AuditLogger::new(Some(file.path())).unwrap());
        let bridge = bridge_with(Directory::new(), audit, &[]);

        let post: AttributeList = vec![("Post-Auth-Type", "REJECT"), ("NAS-Identifier", "switch-01")]
            .into_iter()
            .collect();
        assert_eq!(bridge.post_auth(&post).await.rcode, Rcode::Noop);

        let contents = fs::read_to_string(file.path()).unwrap();
        let line = contents.lines().next().unwrap();
        let raw: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(raw.get("username").is_none());

        let entry: AuditEntry = serde_json::from_str(line).unwrap();
        assert_eq!(entry.event_type, AuditEventType::AuthFailure);
        assert_eq!(entry.username, None);
        assert_eq!(entry.nas.as_deref(), Some("switch-01"));
    }
}
