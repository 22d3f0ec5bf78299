use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("Invalid hex in octet value: {0}")]
    InvalidHex(String),
}

/// Decode an octet value as FreeRADIUS prints it
///
/// Octet attributes are printed as `0x` followed by hex digits. Values
/// without the prefix are taken as their literal bytes, which is what
/// hand-written hook bodies usually send.
pub fn decode_octets(value: &str) -> Result<Vec<u8>, ValueError> {
    let trimmed = value.trim();
    match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(digits) => {
            hex::decode(digits).map_err(|e| ValueError::InvalidHex(e.to_string()))
        }
        None => Ok(trimmed.as_bytes().to_vec()),
    }
}

/// Print octets the way FreeRADIUS does
pub fn encode_octets(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
