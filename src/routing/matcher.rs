//! Rule matching logic.
//!
//! # Responsibilities
//! - Match request headers (name case-insensitive, value exact)
//! - Evaluate the compiled when clause against the payload
//! - Combine both gates with AND semantics
//!
//! # Design Decisions
//! - Empty header requirements = always matches
//! - Absent when clause = always matches
//! - Header gate runs first; it is cheaper than walking the payload
//! - Every declared header must match; one mismatch fails the rule

use std::collections::HashMap;

use serde_json::Value;

use crate::condition::{evaluate, truthy, Condition};
use crate::routing::rule::Rule;

/// Headers of one inbound request. Names are lowercased on insert.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    inner: HashMap<String, String>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header; the first value seen for a name wins.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.inner
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RequestHeaders {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = RequestHeaders::new();
        for (k, v) in iter {
            headers.insert(k.as_ref(), v);
        }
        headers
    }
}

/// Trait for matching an inbound event against one condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the event satisfies this condition.
    fn matches(&self, headers: &RequestHeaders, payload: &Value) -> bool;
}

/// Requires every listed header to be present with exactly the given value.
#[derive(Debug, Clone, Default)]
pub struct HeaderMatcher {
    expected: Vec<(String, String)>,
}

impl HeaderMatcher {
    pub fn new<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut expected: Vec<(String, String)> = headers
            .into_iter()
            .map(|(k, v)| (k.into().to_ascii_lowercase(), v.into()))
            .collect();
        expected.sort();
        Self { expected }
    }

    pub fn expected(&self) -> &[(String, String)] {
        &self.expected
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }
}

impl Matcher for HeaderMatcher {
    fn matches(&self, headers: &RequestHeaders, _payload: &Value) -> bool {
        self.expected
            .iter()
            .all(|(name, value)| headers.get(name) == Some(value.as_str()))
    }
}

/// Matches when the compiled when clause evaluates to a truthy value.
#[derive(Debug, Clone)]
pub struct ConditionMatcher {
    condition: Condition,
}

impl ConditionMatcher {
    pub fn new(condition: Condition) -> Self {
        Self { condition }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }
}

impl Matcher for ConditionMatcher {
    fn matches(&self, _headers: &RequestHeaders, payload: &Value) -> bool {
        truthy(&evaluate(self.condition.root(), payload))
    }
}

/// Decide whether `rule` applies to an inbound event.
pub fn matches(rule: &Rule, headers: &RequestHeaders, payload: &Value) -> bool {
    if !rule.headers.matches(headers, payload) {
        tracing::debug!(rule = %rule.name, "Rule does not match due to headers");
        return false;
    }

    let matched = rule
        .condition
        .as_ref()
        .map(|c| c.matches(headers, payload))
        .unwrap_or(true);
    if !matched {
        tracing::debug!(rule = %rule.name, "Rule does not match due to when clause");
    }
    matched
}
