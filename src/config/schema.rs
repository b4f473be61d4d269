//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::auth::AuthMethod;

/// Forwarding headers consulted, in order, when resolving the client address.
pub const DEFAULT_FORWARD_HEADERS: [&str; 5] = [
    "X-Forwarded-For",
    "Proxy-Client-IP",
    "WL-Proxy-Client-IP",
    "HTTP_CLIENT_IP",
    "HTTP_X_FORWARDED_FOR",
];

/// Root configuration for the gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Authentication settings.
    pub auth: AuthConfig,

    /// Users seeded into the credential store at startup.
    pub users: Vec<UserConfig>,

    /// Brute-force login delay settings.
    pub blocker: BlockerConfig,

    /// Client address resolution behind proxies.
    pub proxy: ProxyConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8984").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8984".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Method used when a request carries no Authorization header.
    pub method: AuthMethod,

    /// Realm announced in challenges and mixed into digest hashes.
    pub realm: String,

    /// User assumed for requests without credentials.
    pub default_user: Option<String>,

    /// Password checked for the default user, if set.
    pub default_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            method: AuthMethod::Basic,
            realm: "docstore".to_string(),
            default_user: None,
            default_password: None,
        }
    }
}

/// A user entry for the credential store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub name: String,
    pub password: String,
}

/// Brute-force delay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockerConfig {
    /// Delay after the first failed login, in milliseconds.
    pub base_delay_ms: u64,

    /// Upper bound on the delay, in milliseconds.
    pub max_delay_ms: u64,

    /// Seconds without a failure after which an address is forgotten.
    pub retention_secs: u64,
}

impl Default for BlockerConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 250,
            max_delay_ms: 8_000,
            retention_secs: 900,
        }
    }
}

/// Proxy trust configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Headers carrying the original client address, first match wins.
    pub forward_headers: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            forward_headers: DEFAULT_FORWARD_HEADERS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
