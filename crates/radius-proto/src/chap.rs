//! CHAP (Challenge-Handshake Authentication Protocol) support
//!
//! RFC 2865 Section 5.3. The NAS sends `CHAP-Password` (identifier plus
//! MD5 response) and the challenge it issued; whoever holds the cleartext
//! secret recomputes the response and compares.

/// CHAP response carried in CHAP-Password
///
/// - CHAP identifier (1 byte)
/// - CHAP response (16 bytes MD5 hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapResponse {
    /// CHAP identifier (must match the challenge)
    pub ident: u8,
    /// MD5 hash of (ident + secret + challenge)
    pub response: [u8; 16],
}

impl ChapResponse {
    /// Length of a CHAP-Password value
    pub const LENGTH: usize = 17;

    /// Parse a CHAP-Password value, which must be exactly 17 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChapError> {
        if bytes.len() != Self::LENGTH {
            return Err(ChapError::InvalidLength(bytes.len()));
        }

        let mut response = [0u8; 16];
        response.copy_from_slice(&bytes[1..]);

        Ok(ChapResponse {
            ident: bytes[0],
            response,
        })
    }

    /// Check this response against a cleartext secret
    pub fn verify(&self, secret: &[u8], challenge: &ChapChallenge) -> bool {
        let expected = compute_chap_response(self.ident, secret, challenge.as_bytes());
        constant_time_eq(&self.response, &expected)
    }
}

/// CHAP challenge
///
/// Taken from the CHAP-Challenge attribute. FreeRADIUS falls back to the
/// Request Authenticator when the attribute is absent, but the authenticator
/// never reaches an external module, so the attribute is required here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapChallenge {
    pub challenge: Vec<u8>,
}

impl ChapChallenge {
    pub fn new(challenge: Vec<u8>) -> Result<Self, ChapError> {
        if challenge.is_empty() {
            return Err(ChapError::ChallengeNotFound);
        }
        Ok(ChapChallenge { challenge })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.challenge
    }
}

/// Compute the expected CHAP response: MD5(ident + secret + challenge)
pub fn compute_chap_response(ident: u8, secret: &[u8], challenge: &[u8]) -> [u8; 16] {
    let mut data = Vec::with_capacity(1 + secret.len() + challenge.len());
    data.push(ident);
    data.extend_from_slice(secret);
    data.extend_from_slice(challenge);

    md5::compute(&data).0
}

/// Compare two secrets without short-circuiting on the first mismatch
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut v: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        v |= x ^ y;
    }
    v == 0
}

/// CHAP-specific errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChapError {
    #[error("Invalid CHAP-Password length: expected 17 bytes, got {0}")]
    InvalidLength(usize),
    #[error("CHAP-Challenge not found")]
    ChallengeNotFound,
}
