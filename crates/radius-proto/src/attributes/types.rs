/// RADIUS attributes the bridge reads from requests or writes into replies
///
/// Numbers follow RFC 2865, 2868, 2869 and 3579. Names are the FreeRADIUS
/// dictionary names, which is how attributes cross the hook boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// User-Name (1) - RFC 2865
    UserName,
    /// User-Password (2) - RFC 2865
    UserPassword,
    /// CHAP-Password (3) - RFC 2865
    ChapPassword,
    /// NAS-IP-Address (4) - RFC 2865
    NasIpAddress,
    /// NAS-Port (5) - RFC 2865
    NasPort,
    /// Service-Type (6) - RFC 2865
    ServiceType,
    /// Framed-Protocol (7) - RFC 2865
    FramedProtocol,
    /// Framed-IP-Address (8) - RFC 2865
    FramedIpAddress,
    /// Filter-Id (11) - RFC 2865
    FilterId,
    /// Reply-Message (18) - RFC 2865
    ReplyMessage,
    /// State (24) - RFC 2865
    State,
    /// Class (25) - RFC 2865
    Class,
    /// Vendor-Specific (26) - RFC 2865
    VendorSpecific,
    /// Session-Timeout (27) - RFC 2865
    SessionTimeout,
    /// Idle-Timeout (28) - RFC 2865
    IdleTimeout,
    /// Called-Station-Id (30) - RFC 2865
    CalledStationId,
    /// Calling-Station-Id (31) - RFC 2865
    CallingStationId,
    /// NAS-Identifier (32) - RFC 2865
    NasIdentifier,
    /// Proxy-State (33) - RFC 2865
    ProxyState,
    /// Acct-Session-Id (44) - RFC 2866
    AcctSessionId,
    /// CHAP-Challenge (60) - RFC 2865
    ChapChallenge,
    /// NAS-Port-Type (61) - RFC 2865
    NasPortType,
    /// Tunnel-Type (64) - RFC 2868
    TunnelType,
    /// Tunnel-Medium-Type (65) - RFC 2868
    TunnelMediumType,
    /// Connect-Info (77) - RFC 2869
    ConnectInfo,
    /// EAP-Message (79) - RFC 3579
    EapMessage,
    /// Message-Authenticator (80) - RFC 3579
    MessageAuthenticator,
    /// Tunnel-Private-Group-Id (81) - RFC 2868
    TunnelPrivateGroupId,
    /// NAS-Port-Id (87) - RFC 2869
    NasPortId,
}

const DICTIONARY: &[(AttributeType, &str)] = &[
    (AttributeType::UserName, "User-Name"),
    (AttributeType::UserPassword, "User-Password"),
    (AttributeType::ChapPassword, "CHAP-Password"),
    (AttributeType::NasIpAddress, "NAS-IP-Address"),
    (AttributeType::NasPort, "NAS-Port"),
    (AttributeType::ServiceType, "Service-Type"),
    (AttributeType::FramedProtocol, "Framed-Protocol"),
    (AttributeType::FramedIpAddress, "Framed-IP-Address"),
    (AttributeType::FilterId, "Filter-Id"),
    (AttributeType::ReplyMessage, "Reply-Message"),
    (AttributeType::State, "State"),
    (AttributeType::Class, "Class"),
    (AttributeType::VendorSpecific, "Vendor-Specific"),
    (AttributeType::SessionTimeout, "Session-Timeout"),
    (AttributeType::IdleTimeout, "Idle-Timeout"),
    (AttributeType::CalledStationId, "Called-Station-Id"),
    (AttributeType::CallingStationId, "Calling-Station-Id"),
    (AttributeType::NasIdentifier, "NAS-Identifier"),
    (AttributeType::ProxyState, "Proxy-State"),
    (AttributeType::AcctSessionId, "Acct-Session-Id"),
    (AttributeType::ChapChallenge, "CHAP-Challenge"),
    (AttributeType::NasPortType, "NAS-Port-Type"),
    (AttributeType::TunnelType, "Tunnel-Type"),
    (AttributeType::TunnelMediumType, "Tunnel-Medium-Type"),
    (AttributeType::ConnectInfo, "Connect-Info"),
    (AttributeType::EapMessage, "EAP-Message"),
    (AttributeType::MessageAuthenticator, "Message-Authenticator"),
    (AttributeType::TunnelPrivateGroupId, "Tunnel-Private-Group-Id"),
    (AttributeType::NasPortId, "NAS-Port-Id"),
];

impl AttributeType {
    /// FreeRADIUS dictionary name
    pub fn name(self) -> &'static str {
        DICTIONARY
            .iter()
            .find(|(attr, _)| *attr == self)
            .map(|(_, name)| *name)
            .unwrap_or("Unknown-Attribute")
    }

}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Microsoft vendor-specific attributes used by MS-CHAP (RFC 2548)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsAttribute {
    /// MS-CHAP-Response (1)
    ChapResponse,
    /// MS-CHAP-Challenge (11)
    ChapChallenge,
    /// MS-CHAP2-Response (25)
    Chap2Response,
}

impl MsAttribute {
    pub fn name(self) -> &'static str {
        match self {
            MsAttribute::ChapResponse => "MS-CHAP-Response",
            MsAttribute::ChapChallenge => "MS-CHAP-Challenge",
            MsAttribute::Chap2Response => "MS-CHAP2-Response",
        }
    }
}

/// Server-internal attributes that only exist inside FreeRADIUS
/// (request, control and reply lists), never on the wire.
pub mod internal {
    pub const STRIPPED_USER_NAME: &str = "Stripped-User-Name";
    pub const CLEARTEXT_PASSWORD: &str = "Cleartext-Password";
    pub const AUTH_TYPE: &str = "Auth-Type";
    pub const POST_AUTH_TYPE: &str = "Post-Auth-Type";
}

/// Tunnel-Type value for VLAN assignment (RFC 3580)
pub const TUNNEL_TYPE_VLAN: &str = "VLAN";

/// Tunnel-Medium-Type value for 802 media (RFC 3580)
pub const TUNNEL_MEDIUM_IEEE_802: &str = "IEEE-802";
