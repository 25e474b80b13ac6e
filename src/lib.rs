//! Event-driven webhook router.
//!
//! Inbound JSON events are matched against an ordered list of rules. Each rule
//! checks request headers and an optional `when` clause over the payload; matched
//! rules render a template per route and deliver it with bounded retries.

pub mod condition;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::{RouterConfig, ServiceConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::RuleEngine;
