//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! confdir (routes.yml, rules.yml, templates/)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (URLs, references, when clause compilation)
//!     → RouterConfig (validated, immutable)
//!     → shared via Arc with the rule engine and dispatcher
//!
//! service.toml (optional)
//!     → loader.rs → validation.rs → ServiceConfig
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All service settings have defaults to allow running without a file
//! - Validation separates syntactic (serde) from semantic checks

use crate::dispatch::TemplateTable;
use crate::routing::{RouteTable, RuleList};

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_confdir, load_service_config, ConfigError};
pub use schema::{DispatchConfig, ListenerConfig, ObservabilityConfig, RulesConfig, ServiceConfig};
pub use validation::ValidationError;

/// Everything the router needs to evaluate and deliver events.
#[derive(Debug, Default)]
pub struct RouterConfig {
    pub routes: RouteTable,
    pub templates: TemplateTable,
    pub rules: RuleList,
}
