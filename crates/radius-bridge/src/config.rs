use crate::client::RetryPolicy;
use crate::translate::{AttributeTemplate, ReplyMapping, VlanGroup};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Wire contract spoken by the identity backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// `POST /v1/radius/verify`, the backend checks the credential
    #[default]
    Verify,
    /// `GET /v1/account/{name}/_radius/_token`, the bridge checks the credential
    RadiusToken,
}

/// Identity backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// Base URL of the identity service, e.g. "https://idm.example.com"
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Bearer token presented to the backend
    #[serde(default)]
    pub token: Option<String>,

    /// Per-attempt timeout in milliseconds (default: 5000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after a timeout or transport failure (default: 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,

    /// Pause before a retry in milliseconds (default: 100)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Verify the backend's TLS certificate (default: true)
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Extra PEM CA certificate to trust
    #[serde(default)]
    pub ca_path: Option<String>,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8443".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_retries() -> u8 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    100
}

fn default_verify_tls() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            kind: BackendKind::default(),
            url: default_backend_url(),
            token: None,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            verify_tls: default_verify_tls(),
            ca_path: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hook listen address
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Hook listen port
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Audit log file path (JSON lines, optional)
    #[serde(default)]
    pub audit_log_path: Option<String>,

    /// Addresses allowed to call the hook (CIDR or single IP, empty = any)
    #[serde(default)]
    pub allowed_clients: Vec<String>,

    /// Auth-Type set in authorize so FreeRADIUS routes back to the bridge
    #[serde(default = "default_auth_type")]
    pub auth_type: String,

    /// Users must hold at least one of these groups (empty = no restriction)
    #[serde(default)]
    pub required_groups: Vec<String>,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub reply: ReplyMapping,
}

fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    8180
}

fn default_auth_type() -> String {
    "idm".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            log_level: None,
            audit_log_path: None,
            allowed_clients: vec![],
            auth_type: default_auth_type(),
            required_groups: vec![],
            backend: BackendConfig::default(),
            reply: ReplyMapping::default(),
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub backend_token: Option<String>,
    pub listen: Option<SocketAddr>,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides; the caller re-validates afterwards
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.backend_url {
            self.backend.url = url;
        }
        if let Some(token) = overrides.backend_token {
            self.backend.token = Some(token);
        }
        if let Some(listen) = overrides.listen {
            self.listen_address = listen.ip().to_string();
            self.listen_port = listen.port();
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr: IpAddr = self
            .listen_address
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("Invalid IP address: {}", self.listen_address)))?;
        Ok(SocketAddr::new(addr, self.listen_port))
    }

    /// Parse `allowed_clients` into networks
    ///
    /// Single addresses become /32 (IPv4) or /128 (IPv6) networks.
    pub fn client_networks(&self) -> Result<Vec<IpNetwork>, ConfigError> {
        self.allowed_clients.iter().map(|entry| parse_network(entry)).collect()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.backend)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.listen_port == 0 {
            return Err(ConfigError::Invalid("Port cannot be 0".to_string()));
        }

        if self.auth_type.trim().is_empty() {
            return Err(ConfigError::Invalid("auth_type cannot be empty".to_string()));
        }

        self.client_networks()?;

        let url = reqwest::Url::parse(&self.backend.url).map_err(|e| {
            ConfigError::Invalid(format!("Invalid backend URL {}: {}", self.backend.url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Invalid(format!(
                "Backend URL must be http or https: {}",
                self.backend.url
            )));
        }

        if self.backend.timeout_ms == 0 {
            return Err(ConfigError::Invalid("Backend timeout cannot be 0".to_string()));
        }

        if self.backend.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid("Backend token is empty".to_string()));
        }

        if let Some(ref path) = self.backend.ca_path {
            if !Path::new(path).is_file() {
                return Err(ConfigError::Invalid(format!("CA certificate not found: {}", path)));
            }
        }

        self.reply.validate().map_err(ConfigError::Invalid)?;

        Ok(())
    }

    /// Create an example configuration file
    pub fn example() -> Self {
        let mut group_attributes = BTreeMap::new();
        group_attributes.insert(
            "admins".to_string(),
            vec![
                AttributeTemplate {
                    attribute: "Filter-Id".to_string(),
                    value: "admins".to_string(),
                },
                AttributeTemplate {
                    attribute: "Class".to_string(),
                    value: "net-admin".to_string(),
                },
            ],
        );

        Config {
            listen_address: "127.0.0.1".to_string(),
            listen_port: 8180,
            log_level: Some("info".to_string()),
            audit_log_path: Some("/var/log/radius-bridge/audit.log".to_string()),
            allowed_clients: vec!["127.0.0.1".to_string(), "10.0.0.0/8".to_string()],
            auth_type: "idm".to_string(),
            required_groups: vec![],
            backend: BackendConfig {
                kind: BackendKind::Verify,
                url: "https://idm.example.com".to_string(),
                token: Some("replace-with-service-token".to_string()),
                ..BackendConfig::default()
            },
            reply: ReplyMapping {
                group_attribute: Some("Filter-Id".to_string()),
                group_attributes,
                default_vlan: None,
                vlan_groups: vec![VlanGroup {
                    group: "guests".to_string(),
                    vlan: 20,
                }],
            },
        }
    }
}

fn parse_network(address: &str) -> Result<IpNetwork, ConfigError> {
    if let Ok(network) = address.parse::<IpNetwork>() {
        return Ok(network);
    }

    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(IpNetwork::from(ip));
    }

    Err(ConfigError::Invalid(format!("Invalid client address: {}", address)))
}
