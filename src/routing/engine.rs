//! Rule evaluation for one inbound event.
//!
//! # Responsibilities
//! - Walk the rule list in declaration order
//! - Hand every matched rule to the dispatcher
//! - Stop at the first matched rule marked `done`
//!
//! # Design Decisions
//! - `process` never waits for deliveries
//! - A rule that does not match never stops the walk, whatever its `done` flag

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config::RouterConfig;
use crate::dispatch::{DeliveryOutcome, Dispatcher};
use crate::observability::metrics;
use crate::routing::matcher::{self, RequestHeaders};

/// What one call to [`RuleEngine::process`] did.
#[derive(Debug, Default)]
pub struct ProcessOutcome {
    /// Matched rule names, in evaluation order.
    pub matched: Vec<String>,
    /// The `done` rule that ended the walk, if any.
    pub stopped_by: Option<String>,
    /// One handle per scheduled delivery. Dropping them does not cancel anything.
    pub deliveries: Vec<JoinHandle<DeliveryOutcome>>,
}

impl ProcessOutcome {
    pub fn is_match(&self) -> bool {
        !self.matched.is_empty()
    }

    /// Wait for every scheduled delivery. Completion order is unspecified.
    pub async fn join(self) -> Vec<DeliveryOutcome> {
        let mut outcomes = Vec::with_capacity(self.deliveries.len());
        for handle in self.deliveries {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!(error = %e, "Delivery task failed"),
            }
        }
        outcomes
    }
}

/// Routes inbound events to the dispatcher.
#[derive(Debug)]
pub struct RuleEngine {
    config: Arc<RouterConfig>,
    dispatcher: Dispatcher,
}

impl RuleEngine {
    pub fn new(config: Arc<RouterConfig>, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Evaluate every rule against one event and schedule deliveries.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn process(&self, payload: Value, headers: &RequestHeaders) -> ProcessOutcome {
        let payload = Arc::new(payload);
        let mut outcome = ProcessOutcome::default();

        for rule in &self.config.rules {
            if !matcher::matches(rule, headers, &payload) {
                continue;
            }

            tracing::info!(rule = %rule.name, routes = ?rule.routes, "Rule matched");
            metrics::record_rule_match(&rule.name);
            outcome.matched.push(rule.name.clone());
            outcome.deliveries.extend(self.dispatcher.dispatch(&payload, rule));

            if rule.done {
                tracing::debug!(rule = %rule.name, "Rule is done, skipping remaining rules");
                outcome.stopped_by = Some(rule.name.clone());
                break;
            }
        }

        if outcome.matched.is_empty() {
            tracing::debug!("No rule matched");
        }
        outcome
    }
}
