//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID)
//! - Bind server to listener
//! - Hand inbound events to the rule engine
//! - Shut down gracefully on signal
//!
//! # Design Decisions
//! - Senders always get `200 OK` once the body is read, even for broken JSON
//! - The handler returns before any delivery is attempted

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;
use crate::routing::{RequestHeaders, RuleEngine};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RuleEngine>,
}

/// HTTP server receiving webhook events.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around `engine`.
    pub fn new(engine: Arc<RuleEngine>, config: &ListenerConfig) -> Self {
        let router = Self::build_router(config, AppState { engine });
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        Router::new()
            .route("/", post(inbound_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for serving elsewhere or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Accepts one webhook event.
async fn inbound_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let request_id = headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Broken JSON payload, ignoring");
            metrics::record_inbound("malformed");
            return StatusCode::OK;
        }
    };
    metrics::record_inbound("accepted");

    let outcome = state.engine.process(payload, &RequestHeaders::from(&headers));
    tracing::debug!(
        request_id = %request_id,
        matched = ?outcome.matched,
        deliveries = outcome.deliveries.len(),
        "Event processed"
    );

    StatusCode::OK
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let config = state.engine.config();
    Json(json!({
        "status": "ok",
        "rules": config.rules.len(),
        "routes": config.routes.len(),
    }))
}
