//! RADIUS token backend
//!
//! The identity service keeps a per-account RADIUS secret and releases it,
//! together with group memberships, to an authorised service account:
//!
//! ```text
//! GET {url}/v1/account/{username}/_radius/_token
//! Authorization: Bearer {token}
//!
//! 200 {"name": "alice", "displayname": "Alice", "uuid": "...",
//!      "secret": "...", "groups": [{"spn": "admins@idm.example.com", "uuid": "..."}]}
//! 404 -> no such account (or no RADIUS secret set)
//! ```
//!
//! PAP and CHAP are checked locally against the released secret. MS-CHAP and
//! EAP need the secret inside FreeRADIUS, which happens in the authorize
//! phase through `Cleartext-Password`.

use super::{
    CredentialRecord, IdentityBackend, Lookup, Verdict, base_url, http_client, join_segments,
    transport_error,
};
use crate::config::BackendConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::request::{AuthRequest, Protocol};
use async_trait::async_trait;
use radius_proto::{ChapChallenge, ChapResponse, constant_time_eq};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::Zeroizing;

#[derive(Deserialize)]
struct RadiusAuthToken {
    name: String,
    #[serde(default)]
    displayname: String,
    #[serde(default)]
    uuid: String,
    secret: Zeroizing<String>,
    #[serde(default)]
    groups: Vec<RadiusGroup>,
}

#[derive(Debug, Deserialize)]
struct RadiusGroup {
    spn: String,
}

pub struct RadiusTokenBackend {
    client: reqwest::Client,
    base: reqwest::Url,
    token: Option<Zeroizing<String>>,
    timeout: Duration,
}

impl RadiusTokenBackend {
    pub fn new(config: &BackendConfig) -> BridgeResult<Self> {
        Ok(RadiusTokenBackend {
            client: http_client(config)?,
            base: base_url(config)?,
            token: config.token.clone().map(Zeroizing::new),
            timeout: config.timeout(),
        })
    }

    pub fn token_url(&self, username: &str) -> BridgeResult<reqwest::Url> {
        join_segments(&self.base, &["v1", "account", username, "_radius", "_token"])
    }
}

/// Check a presented credential against the account's RADIUS secret
fn check_secret(request: &AuthRequest, secret: &str) -> BridgeResult<bool> {
    match request.protocol_hint {
        Protocol::Pap => Ok(constant_time_eq(
            request.presented_secret.as_slice(),
            secret.as_bytes(),
        )),
        Protocol::Chap => {
            let response = ChapResponse::from_bytes(&request.presented_secret)
                .map_err(|e| BridgeError::malformed(e.to_string()))?;
            let challenge = ChapChallenge::new(request.challenge.clone().unwrap_or_default())
                .map_err(|e| BridgeError::malformed(e.to_string()))?;
            Ok(response.verify(secret.as_bytes(), &challenge))
        }
        Protocol::MsChap | Protocol::EapTunnel => Err(BridgeError::Unsupported(format!(
            "{} cannot be verified from a RADIUS token; let FreeRADIUS use the secret from authorize",
            request.protocol_hint
        ))),
    }
}

#[async_trait]
impl IdentityBackend for RadiusTokenBackend {
    fn name(&self) -> &'static str {
        "radius_token"
    }

    async fn verify(&self, request: &AuthRequest) -> BridgeResult<Verdict> {
        let record = match self.lookup(&request.username).await? {
            Lookup::Found(record) => record,
            Lookup::NotFound | Lookup::Unsupported => {
                return Ok(Verdict::Reject {
                    detail: Some("unknown account".to_string()),
                });
            }
        };

        if check_secret(request, &record.secret)? {
            Ok(Verdict::Accept {
                groups: record.groups,
            })
        } else {
            Ok(Verdict::Reject {
                detail: Some("invalid credentials".to_string()),
            })
        }
    }

    async fn lookup(&self, username: &str) -> BridgeResult<Lookup> {
        let url = self.token_url(username)?;
        let mut call = self.client.get(url);
        if let Some(ref token) = self.token {
            call = call.bearer_auth(token.as_str());
        }

        let response = call
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        match response.status() {
            StatusCode::OK => {
                let token: RadiusAuthToken = response
                    .json()
                    .await
                    .map_err(|e| transport_error(e, self.timeout))?;
                if !token.name.eq_ignore_ascii_case(username) {
                    // Accounts may be addressed by SPN or uuid; only note it
                    debug!(requested = %username, name = %token.name, "Token name differs from requested username");
                }
                debug!(
                    username = %username,
                    displayname = %token.displayname,
                    uuid = %token.uuid,
                    groups = token.groups.len(),
                    "Fetched RADIUS token"
                );
                Ok(Lookup::Found(CredentialRecord {
                    username: token.name,
                    secret: token.secret,
                    groups: token.groups.into_iter().map(|g| g.spn).collect(),
                }))
            }
            StatusCode::NOT_FOUND => {
                debug!(username = %username, "No RADIUS token for account");
                Ok(Lookup::NotFound)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(
                    status = response.status().as_u16(),
                    "Identity backend refused RADIUS token request; check the service token"
                );
                Err(BridgeError::BackendRejected(Some(format!(
                    "HTTP {}",
                    response.status().as_u16()
                ))))
            }
            other => Err(BridgeError::BackendResponse(format!(
                "unexpected status {}",
                other.as_u16()
            ))),
        }
    }
}
