//! webrehook (v1)
//!
//! Receives webhooks, matches them against rules and re-sends rendered payloads
//! to downstream services.
//!
//! # Architecture Overview
//!
//! ```text
//!     Sender                 ┌──────────────────────────────────────────────┐
//!     POST / ───────────────▶│ http server ──▶ routing engine               │
//!     ◀──────── 200 OK ──────│                   │ header gate              │
//!                            │                   │ when clause (condition)  │
//!                            │                   ▼                          │
//!                            │               dispatch ── template ──▶ POST ─┼──▶ Route
//!                            │                   │ retries (resilience)     │
//!                            │  config · observability · lifecycle          │
//!                            └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::Parser;

use webrehook::config::validation::validate_settings;
use webrehook::config::{load_service_config, ConfigError, ServiceConfig};
use webrehook::lifecycle::{start, Settings};
use webrehook::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "webrehook", version)]
#[command(about = "Route incoming webhooks to downstream services by rule", long_about = None)]
struct Args {
    /// Directory with routes.yml, rules.yml and templates/
    #[arg(long, env = "CONFDIR", default_value = "./")]
    confdir: PathBuf,

    /// Optional TOML service settings
    #[arg(long, env = "WEBREHOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on [default: 8080]
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// `done` for rules that do not set it [default: true]
    #[arg(long, env = "AUTODONE", value_parser = BoolishValueParser::new())]
    autodone: Option<bool>,

    /// Seconds between delivery attempts [default: 5]
    #[arg(long, env = "DELAY")]
    delay: Option<u64>,

    /// Attempts per delivery [default: 1]
    #[arg(long, env = "TRIES", value_parser = clap::value_parser!(u32).range(1..))]
    tries: Option<u32>,

    /// Log filter directive; bare `--verbose` means `debug`
    #[arg(long, env = "VERBOSE", num_args = 0..=1, default_missing_value = "debug")]
    verbose: Option<String>,
}

impl Args {
    /// Layer command line and environment values over the service settings.
    fn apply(&self, service: &mut ServiceConfig) -> anyhow::Result<()> {
        if let Some(port) = self.port {
            let mut addr: SocketAddr = service
                .listener
                .bind_address
                .parse()
                .with_context(|| format!("invalid bind address '{}'", service.listener.bind_address))?;
            addr.set_port(port);
            service.listener.bind_address = addr.to_string();
        }
        if let Some(autodone) = self.autodone {
            service.rules.autodone = autodone;
        }
        if let Some(delay) = self.delay {
            service.dispatch.delay_secs = delay;
        }
        if let Some(tries) = self.tries {
            service.dispatch.tries = tries;
        }
        if let Some(verbose) = &self.verbose {
            service.observability.log_level = verbose.clone();
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut service = match &args.config {
        Some(path) => load_service_config(path)?,
        None => ServiceConfig::default(),
    };
    args.apply(&mut service)?;
    validate_settings(&service).map_err(ConfigError::Validation)?;

    logging::init(Some(service.observability.log_level.as_str()));

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        confdir = %args.confdir.display(),
        bind_address = %service.listener.bind_address,
        tries = service.dispatch.tries,
        delay_secs = service.dispatch.delay_secs,
        autodone = service.rules.autodone,
        "webrehook starting"
    );

    start(Settings {
        confdir: args.confdir,
        service,
    })
    .await
    .context("router failed")?;

    Ok(())
}
