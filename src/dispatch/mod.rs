//! Outbound delivery subsystem.
//!
//! # Data Flow
//! ```text
//! Matched rule + payload
//!     → dispatcher.rs (one task per route)
//!     → template.rs (render, parse as JSON)
//!     → transport.rs (POST, attempt loop from resilience::retries)
//!     → Delivered | Abandoned | RenderFailed (logged, counted)
//! ```
//!
//! # Design Decisions
//! - Nothing here reports back to the inbound request
//! - Routes of one rule are delivered independently of each other

pub mod dispatcher;
pub mod template;
pub mod transport;

pub use dispatcher::{AttemptFailure, DeliveryOutcome, Dispatcher};
pub use template::TemplateTable;
pub use transport::{HttpTransport, Transport};
