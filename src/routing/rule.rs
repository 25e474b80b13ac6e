//! Compiled rules and the route table.
//!
//! # Responsibilities
//! - Hold one rule after its when clause has been compiled
//! - Hold the named delivery destinations
//!
//! # Design Decisions
//! - Both are immutable after load and shared via `Arc`
//! - Header names are stored lowercased; header values are compared verbatim

use std::collections::BTreeMap;

use url::Url;

use crate::condition;
use crate::error::CompileError;
use crate::routing::matcher::{ConditionMatcher, HeaderMatcher};

/// A named unit combining header requirements, a payload condition and destinations.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub headers: HeaderMatcher,
    pub condition: Option<ConditionMatcher>,
    /// Route names, in declaration order. Never empty once validated.
    pub routes: Vec<String>,
    pub template: String,
    /// Stop evaluating later rules once this one matches.
    pub done: bool,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        routes: Vec<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            headers: HeaderMatcher::default(),
            condition: None,
            routes,
            template: template.into(),
            done: true,
        }
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = HeaderMatcher::new(headers);
        self
    }

    /// Compile and attach a when clause.
    pub fn with_when(mut self, source: &str) -> Result<Self, CompileError> {
        let compiled = condition::compile(&self.name, source)?;
        self.condition = Some(ConditionMatcher::new(compiled));
        Ok(self)
    }

    pub fn with_done(mut self, done: bool) -> Self {
        self.done = done;
        self
    }
}

/// Rules in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct RuleList {
    rules: Vec<Rule>,
}

impl RuleList {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }
}

impl<'a> IntoIterator for &'a RuleList {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Named downstream endpoints.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, Url>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, url: Url) {
        self.routes.insert(name.into(), url);
    }

    pub fn get(&self, name: &str) -> Option<&Url> {
        self.routes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.routes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Url)> for RouteTable {
    fn from_iter<T: IntoIterator<Item = (String, Url)>>(iter: T) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}
