//! Configuration schema definitions.
//!
//! Two families of types live here: the service settings read from an optional
//! TOML file, and the raw shapes of `routes.yml` and `rules.yml` before
//! validation. All types derive Serde traits for deserialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root service settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Inbound listener settings.
    pub listener: ListenerConfig,

    /// Outbound delivery settings.
    pub dispatch: DispatchConfig,

    /// Defaults applied while loading rules.
    pub rules: RulesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,

    /// Inbound request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 10 * 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Outbound delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Attempts per delivery, including the first.
    pub tries: u32,

    /// Seconds to wait between attempts.
    pub delay_secs: u64,

    /// Deliveries allowed to run at once; the rest wait.
    pub max_in_flight: usize,

    /// Per-attempt timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tries: 1,
            delay_secs: 5,
            max_in_flight: 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Rule loading defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    /// `done` value for rules that omit it.
    pub autodone: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self { autodone: true }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "info", "webrehook=debug").
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// `routes.yml`: route name to URL, not yet parsed.
pub type RoutesFile = BTreeMap<String, String>;

/// One entry of `rules.yml` as written. Required fields are checked by validation
/// so that every missing one can be reported.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RuleSpec {
    pub name: Option<String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    pub when: Option<String>,

    pub routes: Option<Vec<String>>,

    pub template: Option<String>,

    pub done: Option<bool>,
}
