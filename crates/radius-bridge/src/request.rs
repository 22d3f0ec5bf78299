//! Request adapter
//!
//! Turns the attribute list FreeRADIUS hands to the hook into a
//! backend-agnostic [`AuthRequest`]. Pure transformation, no I/O.

use crate::error::{BridgeError, BridgeResult};
use radius_proto::{
    AttributeList, AttributeType, ChapResponse, MsAttribute, decode_octets, internal,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroizing;

/// Credential protocol the presented secret belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "pap")]
    Pap,
    #[serde(rename = "chap")]
    Chap,
    #[serde(rename = "mschap")]
    MsChap,
    #[serde(rename = "eap_tunnel")]
    EapTunnel,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Pap => "pap",
            Protocol::Chap => "chap",
            Protocol::MsChap => "mschap",
            Protocol::EapTunnel => "eap_tunnel",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes that carry credential material and never travel as metadata
const CREDENTIAL_ATTRIBUTES: &[&str] = &[
    "User-Password",
    "CHAP-Password",
    "CHAP-Challenge",
    "MS-CHAP-Challenge",
    "MS-CHAP-Response",
    "MS-CHAP2-Response",
    "EAP-Message",
    "Message-Authenticator",
    "State",
    internal::CLEARTEXT_PASSWORD,
];

/// One authentication attempt, normalised
///
/// Built once per inbound request and consumed by a single
/// request/response cycle.
#[derive(Clone)]
pub struct AuthRequest {
    pub username: String,
    /// Password for PAP, CHAP-Password for CHAP, the MS-CHAP response, or
    /// the reassembled EAP payload
    pub presented_secret: Zeroizing<Vec<u8>>,
    /// Challenge the response was computed over (CHAP, MS-CHAP)
    pub challenge: Option<Vec<u8>>,
    pub protocol_hint: Protocol,
    pub client_metadata: BTreeMap<String, String>,
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("username", &self.username)
            .field("presented_secret", &"<redacted>")
            .field("challenge", &self.challenge.as_ref().map(Vec::len))
            .field("protocol_hint", &self.protocol_hint)
            .field("client_metadata", &self.client_metadata)
            .finish()
    }
}

impl AuthRequest {
    /// Build a request from the attributes of an authenticate call
    pub fn from_attributes(attrs: &AttributeList) -> BridgeResult<Self> {
        let username = extract_username(attrs)?;

        let (protocol_hint, presented_secret, challenge) = if attrs
            .contains(AttributeType::EapMessage.name())
        {
            let mut payload = Vec::new();
            for fragment in attrs.all(AttributeType::EapMessage.name()) {
                payload.extend(decode_attr(AttributeType::EapMessage.name(), fragment)?);
            }
            if payload.is_empty() {
                return Err(BridgeError::malformed("EAP-Message is empty"));
            }
            (Protocol::EapTunnel, payload, None)
        } else if let Some(value) = attrs.get(AttributeType::ChapPassword) {
            let chap_password = decode_attr(AttributeType::ChapPassword.name(), value)?;
            ChapResponse::from_bytes(&chap_password)
                .map_err(|e| BridgeError::malformed(e.to_string()))?;
            let challenge = required_octets(attrs, AttributeType::ChapChallenge.name())?;
            (Protocol::Chap, chap_password, Some(challenge))
        } else if let Some((name, value)) = mschap_response(attrs) {
            let response = decode_attr(name, value)?;
            if response.is_empty() {
                return Err(BridgeError::malformed(format!("{name} is empty")));
            }
            let challenge = required_octets(attrs, MsAttribute::ChapChallenge.name())?;
            (Protocol::MsChap, response, Some(challenge))
        } else if let Some(password) = attrs.get(AttributeType::UserPassword) {
            if password.is_empty() {
                return Err(BridgeError::malformed("User-Password is empty"));
            }
            (Protocol::Pap, password.as_bytes().to_vec(), None)
        } else {
            return Err(BridgeError::malformed("no credential attributes present"));
        };

        Ok(AuthRequest {
            username,
            presented_secret: Zeroizing::new(presented_secret),
            challenge,
            protocol_hint,
            client_metadata: client_metadata(attrs),
        })
    }

    /// PAP request built outside the hook (CLI checks, tests)
    pub fn pap(username: impl Into<String>, password: impl AsRef<[u8]>) -> Self {
        AuthRequest {
            username: username.into(),
            presented_secret: Zeroizing::new(password.as_ref().to_vec()),
            challenge: None,
            protocol_hint: Protocol::Pap,
            client_metadata: BTreeMap::new(),
        }
    }
}

/// Username for any phase: Stripped-User-Name wins over User-Name
///
/// `.` and `..` are refused; they would address a different resource once
/// placed in a backend URL path.
pub fn extract_username(attrs: &AttributeList) -> BridgeResult<String> {
    let username = attrs
        .first(internal::STRIPPED_USER_NAME)
        .filter(|name| !name.is_empty())
        .or_else(|| attrs.get(AttributeType::UserName))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| BridgeError::malformed("User-Name missing"))?;

    if username == "." || username == ".." {
        return Err(BridgeError::malformed(format!("invalid User-Name {:?}", username)));
    }
    Ok(username.to_string())
}

fn mschap_response(attrs: &AttributeList) -> Option<(&'static str, &str)> {
    [MsAttribute::Chap2Response, MsAttribute::ChapResponse]
        .into_iter()
        .find_map(|attr| attrs.first(attr.name()).map(|value| (attr.name(), value)))
}

fn required_octets(attrs: &AttributeList, name: &str) -> BridgeResult<Vec<u8>> {
    let value = attrs
        .first(name)
        .ok_or_else(|| BridgeError::malformed(format!("{name} missing")))?;
    let bytes = decode_attr(name, value)?;
    if bytes.is_empty() {
        return Err(BridgeError::malformed(format!("{name} is empty")));
    }
    Ok(bytes)
}

fn decode_attr(name: &str, value: &str) -> BridgeResult<Vec<u8>> {
    decode_octets(value).map_err(|e| BridgeError::malformed(format!("{name}: {e}")))
}

fn client_metadata(attrs: &AttributeList) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    for pair in attrs {
        if CREDENTIAL_ATTRIBUTES.iter().any(|name| pair.is(name)) {
            continue;
        }
        metadata
            .entry(pair.name.clone())
            .or_insert_with(|| pair.value.clone());
    }
    metadata
}
