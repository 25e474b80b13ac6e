//! Condition DSL subsystem.
//!
//! # Data Flow
//! ```text
//! Load time (once per rule):
//!     when clause text
//!     → lexer.rs (tokens with byte offsets)
//!     → parser.rs (ConditionNode tree, path indices folded)
//!     → Condition (immutable, shared by every request)
//!
//! Request time:
//!     Condition + payload
//!     → eval.rs (tree walk)
//!     → path.rs (JSON path lookups)
//!     → JSON value, then truthiness decides the match
//! ```
//!
//! # Design Decisions
//! - Conditions are interpreted from an explicit tree; nothing is executed
//!   outside the operators listed in the grammar
//! - Compilation is pure: the same text always yields the same tree
//! - Evaluation never fails; see eval.rs

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod path;

pub use ast::{Condition, ConditionNode, JsonPath, Step};
pub use eval::{evaluate, truthy};
pub use path::resolve;

use crate::error::CompileError;

/// A lexical or grammatical problem at a byte offset of a when clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Compile the when clause of rule `rule`.
pub fn compile(rule: &str, source: &str) -> Result<Condition, CompileError> {
    let root = lexer::tokenize(source)
        .and_then(|tokens| parser::parse(&tokens, source.len()))
        .map_err(|e| CompileError {
            rule: rule.to_string(),
            offset: e.offset,
            reason: e.message,
        })?;
    Ok(Condition::new(source, root))
}
