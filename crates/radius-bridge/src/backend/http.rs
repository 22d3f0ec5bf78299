//! Credential verification over a JSON HTTP API
//!
//! ```text
//! POST {url}/v1/radius/verify
//! Authorization: Bearer {token}
//!
//! {"username": "alice", "protocol": "pap", "secret": "<base64>",
//!  "challenge": "<base64>", "metadata": {"NAS-Identifier": "ap-1"}}
//!
//! 200 {"outcome": "accept", "groups": ["admins"]}
//! 200 {"outcome": "reject", "detail": "invalid credentials"}
//! 401 / 403 / 404      -> definitive reject
//! anything else        -> backend error
//! ```

use super::{IdentityBackend, Verdict, base_url, http_client, join_segments, transport_error};
use crate::config::BackendConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::request::{AuthRequest, Protocol};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Serialize)]
struct VerifyRequest<'a> {
    username: &'a str,
    protocol: Protocol,
    secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    challenge: Option<String>,
    metadata: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum WireOutcome {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    outcome: WireOutcome,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Backend that asks the identity service to verify each credential
pub struct HttpVerifyBackend {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    token: Option<Zeroizing<String>>,
    timeout: Duration,
}

impl HttpVerifyBackend {
    pub fn new(config: &BackendConfig) -> BridgeResult<Self> {
        let endpoint = join_segments(&base_url(config)?, &["v1", "radius", "verify"])?;
        debug!(endpoint = %endpoint, "Configured credential verification endpoint");

        Ok(HttpVerifyBackend {
            client: http_client(config)?,
            endpoint,
            token: config.token.clone().map(Zeroizing::new),
            timeout: config.timeout(),
        })
    }

    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

#[async_trait]
impl IdentityBackend for HttpVerifyBackend {
    fn name(&self) -> &'static str {
        "verify"
    }

    async fn verify(&self, request: &AuthRequest) -> BridgeResult<Verdict> {
        let secret = Zeroizing::new(STANDARD.encode(request.presented_secret.as_slice()));
        let body = VerifyRequest {
            username: &request.username,
            protocol: request.protocol_hint,
            secret: &secret,
            challenge: request.challenge.as_ref().map(|c| STANDARD.encode(c)),
            metadata: &request.client_metadata,
        };

        let mut call = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(ref token) = self.token {
            call = call.bearer_auth(token.as_str());
        }

        let response = call
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status();
        debug!(
            username = %request.username,
            status = status.as_u16(),
            "Identity backend answered verification"
        );

        match status {
            StatusCode::OK => {
                let verdict: VerifyResponse = response
                    .json()
                    .await
                    .map_err(|e| transport_error(e, self.timeout))?;
                Ok(match verdict.outcome {
                    WireOutcome::Accept => Verdict::Accept {
                        groups: verdict.groups.into_iter().collect::<BTreeSet<_>>(),
                    },
                    WireOutcome::Reject => Verdict::Reject {
                        detail: verdict.detail,
                    },
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Err(
                BridgeError::BackendRejected(Some(format!("HTTP {}", status.as_u16()))),
            ),
            other => Err(BridgeError::BackendResponse(format!(
                "unexpected status {}",
                other.as_u16()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_config() {
        let config = BackendConfig {
            url: "http://127.0.0.1:9000/idm/".to_string(),
            ..Default::default()
        };
        let backend = HttpVerifyBackend::new(&config).unwrap();
        assert_eq!(
            backend.endpoint().as_str(),
            "http://127.0.0.1:9000/idm/v1/radius/verify"
        );
        assert_eq!(backend.name(), "verify");
    }

    #[test]
    fn test_request_body_shape() {
        let mut request = AuthRequest::pap("alice", "pw");
        request
            .client_metadata
            .insert("NAS-Identifier".to_string(), "ap-1".to_string());
        let body = VerifyRequest {
            username: &request.username,
            protocol: request.protocol_hint,
            secret: "cHc=",
            challenge: None,
            metadata: &request.client_metadata,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["protocol"], "pap");
        assert_eq!(json["secret"], "cHc=");
        assert_eq!(json["metadata"]["NAS-Identifier"], "ap-1");
        assert!(json.get("challenge").is_none());
    }

    #[test]
    fn test_response_defaults() {
        let response: VerifyResponse = serde_json::from_str(r#"{"outcome":"reject"}"#).unwrap();
        assert_eq!(response.outcome, WireOutcome::Reject);
        assert!(response.groups.is_empty());
        assert!(response.detail.is_none());

        assert!(serde_json::from_str::<VerifyResponse>(r#"{"outcome":"maybe"}"#).is_err());
    }
}
