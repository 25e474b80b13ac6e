//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound event (payload, headers)
//!     → engine.rs (walk rules in declaration order)
//!     → matcher.rs (header gate, then when clause)
//!     → matched: hand to dispatch, stop if the rule is done
//!
//! Rule compilation (at startup):
//!     rules.yml entries
//!     → compile when clauses
//!     → freeze as immutable RuleList
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - Deterministic: same input always matches the same rules in the same order
//! - Matching never suspends; only delivery is asynchronous

pub mod engine;
pub mod matcher;
pub mod rule;

pub use engine::{ProcessOutcome, RuleEngine};
pub use matcher::{matches, ConditionMatcher, HeaderMatcher, Matcher, RequestHeaders};
pub use rule::{RouteTable, Rule, RuleList};
