//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize all subsystems in dependency order
//! - Start background tasks (metrics endpoint, signal handler)
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, nothing is served half-configured
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::{load_confdir, ConfigError, DispatchConfig, RouterConfig, ServiceConfig};
use crate::dispatch::{Dispatcher, HttpTransport};
use crate::error::TransportError;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::routing::RuleEngine;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot build HTTP client: {0}")]
    Transport(#[from] TransportError),

    #[error("cannot start metrics endpoint: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("cannot listen on {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Fully resolved settings for one router process.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding routes.yml, rules.yml and templates/.
    pub confdir: PathBuf,
    pub service: ServiceConfig,
}

/// Wire the rule engine to a real HTTP transport.
pub fn build_engine(config: RouterConfig, dispatch: &DispatchConfig) -> Result<Arc<RuleEngine>, StartupError> {
    let config = Arc::new(config);
    let transport = HttpTransport::new(Duration::from_secs(dispatch.request_timeout_secs))?;
    let dispatcher = Dispatcher::new(Arc::clone(&config), Arc::new(transport), dispatch);

    tracing::info!(
        tries = dispatcher.policy().tries(),
        delay = ?dispatcher.policy().delay(),
        max_in_flight = dispatch.max_in_flight,
        "Dispatcher ready"
    );

    Ok(Arc::new(RuleEngine::new(config, dispatcher)))
}

/// Serve `engine` on `listener` until `shutdown` fires, then stop new deliveries.
pub async fn serve(
    engine: Arc<RuleEngine>,
    service: &ServiceConfig,
    listener: TcpListener,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    let server = HttpServer::new(Arc::clone(&engine), &service.listener);
    server.run(listener, shutdown.signalled()).await?;

    engine.dispatcher().close();
    Ok(())
}

/// Run the router until SIGINT/SIGTERM.
pub async fn start(settings: Settings) -> Result<(), StartupError> {
    let service = &settings.service;

    let config = load_confdir(&settings.confdir, service.rules.autodone)?;

    if service.observability.metrics_enabled {
        match service.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %service.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let engine = build_engine(config, &service.dispatch)?;

    let address = service.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;
    tracing::info!(address = %listener.local_addr()?, "Listening for events");

    let shutdown = Shutdown::new();
    signals::spawn_handler(&shutdown);

    serve(engine, service, listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
