//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Delivery to a route:
//!     → retries.rs (attempt, wait fixed delay, attempt again)
//!     → budget spent: delivery abandoned and logged
//! ```
//!
//! # Design Decisions
//! - Timeouts live on the HTTP client; every attempt has a deadline
//! - Attempts of one delivery never affect another delivery

pub mod retries;

pub use retries::RetryPolicy;
