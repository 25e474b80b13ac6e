//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Pick the filter: `RUST_LOG` first, then the configured directive
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Installing twice is not an error (tests and tools call `init` freely)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor a directive is given.
pub const DEFAULT_DIRECTIVE: &str = "webrehook=info,tower_http=info";

/// Install the global subscriber.
///
/// `directive` is an `EnvFilter` directive such as `debug` or
/// `webrehook=debug,tower_http=warn`. Invalid directives fall back to
/// [`DEFAULT_DIRECTIVE`].
pub fn init(directive: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        directive
            .and_then(|d| EnvFilter::try_new(d).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
