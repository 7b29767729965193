//! Event pattern matching.
//!
//! A pattern pins the event source and detail type and constrains a set of
//! detail fields. Fields are AND-ed; the accepted values of one field are
//! OR-ed. Fields the pattern does not name are unconstrained.

use crate::event::LifecycleEvent;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Field name to accepted-value set
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetailMatch {
    fields: IndexMap<String, BTreeSet<String>>,
}

impl DetailMatch {
    /// Create an empty (match-anything) detail predicate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the given values for a field, adding to any already accepted
    #[must_use]
    pub fn with_field<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .entry(field.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Accepted values for a field
    #[must_use]
    pub fn accepted(&self, field: &str) -> Option<&BTreeSet<String>> {
        self.fields.get(field)
    }

    /// Iterate over constrained fields
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.fields.iter()
    }

    /// Number of constrained fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if no field is constrained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Evaluate against an event's detail
    #[must_use]
    pub fn evaluate(&self, event: &LifecycleEvent) -> MatchResult {
        let mut result = MatchResult::new(true);
        for (field, accepted) in &self.fields {
            match event.field(field) {
                Some(Value::String(value)) if accepted.contains(value) => {
                    result.captures.insert(field.clone(), value.clone());
                }
                _ => return MatchResult::new(false),
            }
        }
        result
    }
}

/// Pattern over source, detail type and detail fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPattern {
    /// Required event source
    pub source: String,
    /// Required detail type
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    /// Detail field predicate
    pub detail: DetailMatch,
}

impl EventPattern {
    /// Create a pattern with no detail constraints
    #[must_use]
    pub fn new(source: impl Into<String>, detail_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            detail_type: detail_type.into(),
            detail: DetailMatch::new(),
        }
    }

    /// Replace the detail predicate
    #[must_use]
    pub fn with_detail(mut self, detail: DetailMatch) -> Self {
        self.detail = detail;
        self
    }

    /// Match the pattern against an event
    #[must_use]
    pub fn matches(&self, event: &LifecycleEvent) -> MatchResult {
        if event.source != self.source || event.detail_type != self.detail_type {
            return MatchResult::new(false);
        }
        self.detail.evaluate(event)
    }
}

/// Match result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Whether the pattern matched
    pub matched: bool,
    /// Detail values that satisfied each constrained field
    pub captures: IndexMap<String, String>,
}

impl MatchResult {
    /// Create a new match result
    #[must_use]
    pub fn new(matched: bool) -> Self {
        Self {
            matched,
            captures: IndexMap::new(),
        }
    }

    /// Check if matched
    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.matched
    }
}
