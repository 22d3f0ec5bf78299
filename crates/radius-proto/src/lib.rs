//! RADIUS dictionary support for the FreeRADIUS identity bridge
//!
//! FreeRADIUS does the protocol work (packet framing, password hiding,
//! EAP). This crate holds what an external module still needs to know
//! about RADIUS to make sense of the attributes it is handed:
//!
//! - Attribute names and numbers (RFC 2865, 2868, 2869, 3579, 2548)
//! - Ordered, case-insensitive attribute lists
//! - FreeRADIUS value printing (`0x` hex octets)
//! - CHAP response computation and verification
//!
//! # Example
//!
//! ```rust
//! use radius_proto::{AttributeList, AttributeType, ChapChallenge, ChapResponse};
//! use radius_proto::{compute_chap_response, decode_octets, encode_octets};
//!
//! let challenge = b"0123456789abcdef";
//! let mut chap_password = vec![7u8];
//! chap_password.extend_from_slice(&compute_chap_response(7, b"password", challenge));
//!
//! let mut request = AttributeList::new();
//! request.push("User-Name", "alice");
//! request.push("CHAP-Password", encode_octets(&chap_password));
//! request.push("CHAP-Challenge", encode_octets(challenge));
//!
//! let value = decode_octets(request.get(AttributeType::ChapPassword).unwrap()).unwrap();
//! let response = ChapResponse::from_bytes(&value).unwrap();
//! let challenge = ChapChallenge::new(challenge.to_vec()).unwrap();
//! assert!(response.verify(b"password", &challenge));
//! ```

pub mod attributes;
pub mod chap;

pub use attributes::types::{TUNNEL_MEDIUM_IEEE_802, TUNNEL_TYPE_VLAN, internal};
pub use attributes::{
    AttributeList, AttributePair, AttributeType, MsAttribute, ValueError, decode_octets,
    encode_octets,
};
pub use chap::{ChapChallenge, ChapError, ChapResponse, compute_chap_response, constant_time_eq};
