//! Per-resource change detection between a graph and recorded state.

use crate::state::CurrentState;
use schedstack_core::{Digest, ResourceId};
use schedstack_plan::{Resource, ResourceGraph};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content digest of one resource
///
/// Resources encode to JSON with string keys only, so the empty-input
/// fallback is unreachable.
#[must_use]
pub fn resource_digest(resource: &Resource) -> Digest {
    Digest::of_json(resource).unwrap_or_else(|_| Digest::compute(&[]))
}

/// What happens to a resource when a graph is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    /// Not recorded yet
    Create,
    /// Recorded with a different digest
    Update,
    /// Recorded but no longer in the graph
    Delete,
    /// Recorded with the same digest
    Unchanged,
}

/// Resource ids grouped by change kind
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    /// New resources, dependency order
    pub create: Vec<ResourceId>,
    /// Modified resources, dependency order
    pub update: Vec<ResourceId>,
    /// Removed resources, dependents first
    pub delete: Vec<ResourceId>,
    /// Untouched resources
    pub unchanged: Vec<ResourceId>,
}

impl ChangeSet {
    /// Compare `graph` against `current`
    #[must_use]
    pub fn compute(graph: &ResourceGraph, current: &CurrentState) -> Self {
        let mut changes = Self::default();

        for resource in graph.iter() {
            match current.digest_of(resource.id) {
                None => changes.create.push(resource.id),
                Some(recorded) if recorded == resource_digest(resource) => {
                    changes.unchanged.push(resource.id);
                }
                Some(_) => changes.update.push(resource.id),
            }
        }

        changes.delete = current
            .ids()
            .rev()
            .filter(|id| graph.get(*id).is_none())
            .collect();

        tracing::debug!(stack = %graph.stack, summary = %changes, "computed change set");
        changes
    }

    /// Kind of change for `id`, if it appears at all
    #[must_use]
    pub fn kind_of(&self, id: ResourceId) -> Option<ChangeKind> {
        [
            (ChangeKind::Create, &self.create),
            (ChangeKind::Update, &self.update),
            (ChangeKind::Delete, &self.delete),
            (ChangeKind::Unchanged, &self.unchanged),
        ]
        .into_iter()
        .find(|(_, ids)| ids.contains(&id))
        .map(|(kind, _)| kind)
    }

    /// Check whether applying would change anything
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !(self.create.is_empty() && self.update.is_empty() && self.delete.is_empty())
    }

    /// Total number of ids across all kinds
    #[must_use]
    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len() + self.unchanged.len()
    }

    /// Check whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} ~{} -{} ={}",
            self.create.len(),
            self.update.len(),
            self.delete.len(),
            self.unchanged.len()
        )
    }
}
