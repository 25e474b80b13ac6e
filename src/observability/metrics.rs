//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (inbound events, matches, deliveries)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `webrehook_inbound_total` (counter): inbound events by outcome (accepted, malformed)
//! - `webrehook_rule_matches_total` (counter): matches by rule
//! - `webrehook_delivery_attempts_total` (counter): attempts by route, result
//! - `webrehook_deliveries_total` (counter): finished deliveries by route, outcome
//! - `webrehook_deliveries_in_flight` (gauge): deliveries currently sending
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels for rule, route and outcome only; never payload data

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

const INBOUND_TOTAL: &str = "webrehook_inbound_total";
const RULE_MATCHES_TOTAL: &str = "webrehook_rule_matches_total";
const DELIVERY_ATTEMPTS_TOTAL: &str = "webrehook_delivery_attempts_total";
const DELIVERIES_TOTAL: &str = "webrehook_deliveries_total";
const DELIVERIES_IN_FLIGHT: &str = "webrehook_deliveries_in_flight";

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!(INBOUND_TOTAL, "Inbound events by outcome");
    metrics::describe_counter!(RULE_MATCHES_TOTAL, "Rule matches by rule");
    metrics::describe_counter!(DELIVERY_ATTEMPTS_TOTAL, "Delivery attempts by route and result");
    metrics::describe_counter!(DELIVERIES_TOTAL, "Finished deliveries by route and outcome");
    metrics::describe_gauge!(DELIVERIES_IN_FLIGHT, "Deliveries currently sending");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_inbound(outcome: &'static str) {
    metrics::counter!(INBOUND_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_rule_match(rule: &str) {
    metrics::counter!(RULE_MATCHES_TOTAL, "rule" => rule.to_string()).increment(1);
}

pub fn record_attempt(route: &str, result: &'static str) {
    metrics::counter!(DELIVERY_ATTEMPTS_TOTAL, "route" => route.to_string(), "result" => result)
        .increment(1);
}

pub fn record_delivery(route: &str, outcome: &'static str) {
    metrics::counter!(DELIVERIES_TOTAL, "route" => route.to_string(), "outcome" => outcome)
        .increment(1);
}

/// Holds the in-flight gauge up for as long as it lives.
pub struct InFlight(());

impl InFlight {
    pub fn enter() -> Self {
        metrics::gauge!(DELIVERIES_IN_FLIGHT).increment(1.0);
        InFlight(())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        metrics::gauge!(DELIVERIES_IN_FLIGHT).decrement(1.0);
    }
}
