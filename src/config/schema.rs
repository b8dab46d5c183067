//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, public scheme).
    pub listener: ListenerConfig,

    /// Root domain and hostname aliases.
    pub domain: DomainConfig,

    /// Replica connection and trust settings.
    pub replica: ReplicaConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Scheme clients used to reach us; TLS terminates in front of the gateway.
    pub public_scheme: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            public_scheme: "https".to_string(),
        }
    }
}

/// Domain configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Root domain suffix (e.g., "ic0.app").
    pub root: String,

    /// Force local-development mode. Derived from `root` when unset.
    pub local_mode: Option<bool>,

    /// Hostnames served by a fixed canister.
    pub aliases: Vec<AliasConfig>,
}

impl DomainConfig {
    pub fn is_local_mode(&self) -> bool {
        self.local_mode
            .unwrap_or_else(|| self.root.eq_ignore_ascii_case("localhost"))
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            root: "ic0.app".to_string(),
            local_mode: None,
            aliases: default_aliases(),
        }
    }
}

/// A hostname mapped to a canister.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AliasConfig {
    /// Exact hostname, without port.
    pub host: String,

    /// Textual canister id.
    pub canister_id: String,

    /// Domain the canister is reached through.
    #[serde(default = "default_alias_domain")]
    pub domain: String,
}

fn default_alias_domain() -> String {
    "ic0.app".to_string()
}

fn default_aliases() -> Vec<AliasConfig> {
    [
        ("identity.ic0.app", "rdmx6-jaaaa-aaaaa-aaadq-cai"),
        ("nns.ic0.app", "qoctq-giaaa-aaaaa-aaaea-cai"),
        ("dscvr.one", "h5aet-waaaa-aaaab-qaamq-cai"),
        ("dscvr.ic0.app", "h5aet-waaaa-aaaab-qaamq-cai"),
        ("personhood.ic0.app", "g3wsl-eqaaa-aaaan-aaaaa-cai"),
    ]
    .into_iter()
    .map(|(host, canister_id)| AliasConfig {
        host: host.to_string(),
        canister_id: canister_id.to_string(),
        domain: default_alias_domain(),
    })
    .collect()
}

/// Replica a local-mode gateway talks to when `replica.url` is unset.
pub const LOCAL_REPLICA_URL: &str = "http://127.0.0.1:4943";

/// Replica configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplicaConfig {
    /// Fixed replica URL. When unset the origin is derived per request, or
    /// [`LOCAL_REPLICA_URL`] in local mode.
    pub url: Option<String>,

    /// Trust the root key reported by the replica. Development only.
    pub fetch_root_key: bool,

    /// Maximum accepted certificate age in seconds.
    pub max_certificate_age_secs: u64,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            url: None,
            fetch_root_key: false,
            max_certificate_age_secs: 300,
        }
    }
}

/// Timeout configuration for outbound HTTP.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl GatewayConfig {
    /// Replica every RPC and `/api/` request goes to, if fixed.
    pub fn replica_url(&self) -> Option<&str> {
        match &self.replica.url {
            Some(url) => Some(url.as_str()),
            None if self.domain.is_local_mode() => Some(LOCAL_REPLICA_URL),
            None => None,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Hosts foreign-origin passthrough may reach, subdomains included.
    /// Empty allows any host; the inbound `Host` header is client-controlled.
    pub passthrough_hosts: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            passthrough_hosts: Vec::new(),
        }
    }
}
