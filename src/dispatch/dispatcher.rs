//! Fan-out of matched events to downstream routes.
//!
//! # Responsibilities
//! - Spawn one independent delivery per route of a matched rule
//! - Render the rule's template and parse it as the outbound body
//! - Attempt delivery within the retry budget; 2xx is success
//! - Cap the number of deliveries in flight; a delivery that finds no free
//!   slot is dropped instead of queued
//!
//! # Design Decisions
//! - Deliveries are detached tasks; the inbound request never waits on them
//! - A failing route never blocks or cancels another route
//! - Render failures are not retried, the output would be identical
//! - Outcomes are observable through logs and metrics only; the join handles
//!   exist for callers that want to wait (tests, tooling)

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::config::{DispatchConfig, RouterConfig};
use crate::dispatch::transport::Transport;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::routing::Rule;

/// Why a single attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Downstream answered outside 2xx.
    Status(u16),
    /// No response was obtained.
    Transport(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Status(status) => write!(f, "downstream returned status {}", status),
            AttemptFailure::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

/// Final outcome of one (rule, route) delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Abandoned { attempts: u32, last_failure: AttemptFailure },
    /// Template rendering or JSON parsing failed; nothing was sent.
    RenderFailed,
    /// The dispatcher was closed, or every delivery slot was taken.
    Dropped,
}

impl DeliveryOutcome {
    fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered { .. } => "delivered",
            DeliveryOutcome::Abandoned { .. } => "abandoned",
            DeliveryOutcome::RenderFailed => "render_failed",
            DeliveryOutcome::Dropped => "dropped",
        }
    }
}

struct Delivery {
    id: Uuid,
    route: String,
    url: Url,
    template: String,
    payload: Arc<Value>,
    _permit: OwnedSemaphorePermit,
}

/// Sends rendered payloads to the routes of matched rules.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<RouterConfig>,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<RouterConfig>,
        transport: Arc<dyn Transport>,
        settings: &DispatchConfig,
    ) -> Self {
        Self {
            config,
            transport,
            policy: RetryPolicy::from(settings),
            permits: Arc::new(Semaphore::new(settings.max_in_flight.max(1))),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Start one delivery per route of `rule`. Returns immediately.
    ///
    /// Only started deliveries get a handle. Routes dropped for lack of a
    /// slot are logged and counted.
    pub fn dispatch(&self, payload: &Arc<Value>, rule: &Rule) -> Vec<JoinHandle<DeliveryOutcome>> {
        let mut handles = Vec::with_capacity(rule.routes.len());

        for route in &rule.routes {
            let Some(url) = self.config.routes.get(route) else {
                tracing::error!(rule = %rule.name, route = %route, "Rule references unknown route, skipping");
                continue;
            };

            let permit = match Arc::clone(&self.permits).try_acquire_owned() {
                Ok(permit) => permit,
                Err(TryAcquireError::Closed) => {
                    tracing::warn!(rule = %rule.name, route = %route, "Dispatcher closed, dropping delivery");
                    metrics::record_delivery(route, DeliveryOutcome::Dropped.label());
                    continue;
                }
                Err(TryAcquireError::NoPermits) => {
                    tracing::warn!(rule = %rule.name, route = %route, "Delivery limit reached, dropping delivery");
                    metrics::record_delivery(route, DeliveryOutcome::Dropped.label());
                    continue;
                }
            };

            let delivery = Delivery {
                id: Uuid::new_v4(),
                route: route.clone(),
                url: url.clone(),
                template: rule.template.clone(),
                payload: Arc::clone(payload),
                _permit: permit,
            };
            let span = tracing::info_span!(
                "delivery",
                delivery_id = %delivery.id,
                rule = %rule.name,
                route = %route,
            );

            let this = self.clone();
            handles.push(tokio::spawn(
                async move { this.deliver(delivery).await }.instrument(span),
            ));
        }

        handles
    }

    /// Stop starting new deliveries. Deliveries already started run to completion.
    pub fn close(&self) {
        self.permits.close();
    }

    async fn deliver(&self, delivery: Delivery) -> DeliveryOutcome {
        let outcome = self.run(&delivery).await;
        metrics::record_delivery(&delivery.route, outcome.label());
        outcome
    }

    async fn run(&self, delivery: &Delivery) -> DeliveryOutcome {
        let _in_flight = metrics::InFlight::enter();

        let body = match self.config.templates.render(&delivery.template, &delivery.payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(template = %delivery.template, error = %e, "Render failed, delivery aborted");
                return DeliveryOutcome::RenderFailed;
            }
        };

        let transport = &self.transport;
        let url = &delivery.url;
        let route = delivery.route.as_str();
        let body = &body;

        let result = self
            .policy
            .run(|attempt| async move {
                match transport.post_json(url, body).await {
                    Ok(status) if (200..300).contains(&status) => {
                        metrics::record_attempt(route, "success");
                        tracing::debug!(attempt, status, "Attempt succeeded");
                        Ok(())
                    }
                    Ok(status) => {
                        metrics::record_attempt(route, "status");
                        Err(AttemptFailure::Status(status))
                    }
                    Err(e) => {
                        metrics::record_attempt(route, "transport");
                        Err(AttemptFailure::Transport(e.to_string()))
                    }
                }
            })
            .await;

        match result {
            Ok(attempts) => {
                tracing::info!(attempts, "Delivered");
                DeliveryOutcome::Delivered { attempts }
            }
            Err((attempts, last_failure)) => {
                tracing::error!(attempts, error = %last_failure, "Delivery abandoned");
                DeliveryOutcome::Abandoned {
                    attempts,
                    last_failure,
                }
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("policy", &self.policy)
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}
