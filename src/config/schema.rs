//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the origin
//! service and the relay distributions in front of it.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Origin service (the unreliable greeting handler).
    pub origin: OriginConfig,

    /// Relay distributions, one listener each.
    pub relays: Vec<DistributionConfig>,

    /// Redirect/retry protocol settings applied by the origin-response hook.
    pub redirect: RedirectConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: OriginConfig::default(),
            relays: vec![
                DistributionConfig {
                    name: "same-origin".to_string(),
                    bind_address: "127.0.0.1:8080".to_string(),
                    tls: None,
                    is_cors: false,
                    viewer_request_hook: false,
                    origin_url: "http://127.0.0.1:3000/prod".to_string(),
                    api_key: None,
                },
                DistributionConfig {
                    name: "cors".to_string(),
                    bind_address: "127.0.0.1:8443".to_string(),
                    tls: None,
                    is_cors: true,
                    viewer_request_hook: true,
                    origin_url: "http://127.0.0.1:3000/prod".to_string(),
                    api_key: None,
                },
            ],
            redirect: RedirectConfig::default(),
            timeouts: TimeoutConfig::default(),
            security: SecurityConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Origin service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Run the origin service in this process.
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,

    /// Path the greeting handler is mounted on.
    pub route: String,

    /// Probability in [0, 1] that a request is answered with an injected 502.
    pub failure_probability: f64,

    /// Shared key the relay must present in `X-API-Key`. No check when unset.
    pub api_key: Option<String>,

    /// Usage-plan throttle in front of the handler.
    pub throttle: ThrottleConfig,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:3000".to_string(),
            route: "/prod/api".to_string(),
            failure_probability: 0.25,
            api_key: None,
            throttle: ThrottleConfig::default(),
        }
    }
}

/// Token bucket throttle keyed by API key.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Enable throttling.
    pub enabled: bool,

    /// Steady-state requests per second per key.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 10,
            burst_size: 2,
        }
    }
}

/// One relay listener and the origin it forwards to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DistributionConfig {
    /// Distribution identifier for logging/metrics.
    pub name: String,

    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Optional TLS configuration for the viewer side.
    #[serde(default)]
    pub tls: Option<TlsConfig>,

    /// Value sent to the origin in `X-Is-Cors`.
    #[serde(default)]
    pub is_cors: bool,

    /// Run the viewer-request hook on inbound requests.
    #[serde(default)]
    pub viewer_request_hook: bool,

    /// Origin base URL including the origin path (e.g., "http://127.0.0.1:3000/prod").
    pub origin_url: String,

    /// Key attached to every origin request in `X-API-Key`.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// TLS configuration for a relay listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Redirect protocol configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Retry ceiling: redirects issued before the failure is surfaced.
    pub max_redirects: u32,

    /// `Max-Age` of the `RedirectCount` cookie in seconds.
    pub cookie_max_age_secs: u64,

    /// Origin status that triggers a redirect.
    pub transient_status: u16,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            max_redirects: 3,
            cookie_max_age_secs: 60,
            transient_status: 502,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Time the relay waits for the origin in seconds.
    pub origin_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            origin_secs: 10,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
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
            log_format: LogFormat::Plain,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
