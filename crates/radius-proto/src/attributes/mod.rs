//! RADIUS attributes as the FreeRADIUS hook sees them
//!
//! FreeRADIUS hands attributes to external modules by dictionary name with
//! values already printed to text. This module keeps them in that form and
//! provides the dictionary knowledge needed to interpret them.

pub mod pair;
pub mod types;
pub mod value;

pub use pair::{AttributeList, AttributePair};
pub use types::{AttributeType, MsAttribute};
pub use value::{ValueError, decode_octets, encode_octets};
