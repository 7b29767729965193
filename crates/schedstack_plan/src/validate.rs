//! Graph validation: completeness, acyclicity, uniform tagging.

use crate::graph::Resource;
use indexmap::{IndexMap, IndexSet};
use schedstack_core::{ResourceId, StackError, StackResult, Tags};

/// Validator for assembled resource sets
#[derive(Debug, Clone)]
pub struct GraphValidator {
    /// Require every member to carry the stack tag pair
    pub require_uniform_tags: bool,
    /// Maximum allowed resources (0 = no limit)
    pub max_resources: usize,
}

impl GraphValidator {
    /// Create a new validator
    #[must_use]
    pub fn new() -> Self {
        Self {
            require_uniform_tags: true,
            max_resources: 0,
        }
    }

    /// Set whether uniform tags are required
    #[must_use]
    pub fn with_require_uniform_tags(mut self, require: bool) -> Self {
        self.require_uniform_tags = require;
        self
    }

    /// Set maximum resource count
    #[must_use]
    pub fn with_max_resources(mut self, max: usize) -> Self {
        self.max_resources = max;
        self
    }

    /// Validate `resources` and return their ids dependencies-first
    ///
    /// Ties are broken by insertion order, so the result is stable.
    ///
    /// # Errors
    ///
    /// Returns `IncompleteGraph` for a dependency outside the set,
    /// `CycleDetected` for a dependency cycle, or a validation error for a
    /// member whose tags differ from `tags`
    pub fn validate(
        &self,
        resources: &IndexMap<ResourceId, Resource>,
        tags: &Tags,
    ) -> StackResult<Vec<ResourceId>> {
        if self.max_resources > 0 && resources.len() > self.max_resources {
            return Err(StackError::validation(
                "graph.resources",
                format!("{} resources exceeds max {}", resources.len(), self.max_resources),
            ));
        }

        self.check_references(resources)?;
        if self.require_uniform_tags {
            self.check_tags(resources, tags)?;
        }
        self.check_cycles(resources)?;
        Ok(self.order(resources))
    }

    fn check_references(&self, resources: &IndexMap<ResourceId, Resource>) -> StackResult<()> {
        for resource in resources.values() {
            if let Some(missing) = resource
                .dependencies
                .iter()
                .find(|dep| !resources.contains_key(*dep))
            {
                return Err(StackError::IncompleteGraph {
                    resource: resource.logical_name.clone(),
                    missing: missing.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_tags(&self, resources: &IndexMap<ResourceId, Resource>, tags: &Tags) -> StackResult<()> {
        match resources.values().find(|r| &r.tags != tags) {
            Some(resource) => Err(StackError::validation(
                format!("{}.tags", resource.logical_name),
                "tags differ from the stack tag pair",
            )),
            None => Ok(()),
        }
    }

    fn check_cycles(&self, resources: &IndexMap<ResourceId, Resource>) -> StackResult<()> {
        let mut visited = IndexSet::new();
        let mut rec_stack = IndexSet::new();

        for &id in resources.keys() {
            if self.dfs_cycle(id, resources, &mut visited, &mut rec_stack) {
                return Err(StackError::CycleDetected {
                    resources: rec_stack
                        .iter()
                        .filter_map(|id| resources.get(id))
                        .map(|r| r.logical_name.clone())
                        .collect(),
                });
            }
        }
        Ok(())
    }

    fn dfs_cycle(
        &self,
        id: ResourceId,
        resources: &IndexMap<ResourceId, Resource>,
        visited: &mut IndexSet<ResourceId>,
        rec_stack: &mut IndexSet<ResourceId>,
    ) -> bool {
        if rec_stack.contains(&id) {
            return true;
        }
        if visited.contains(&id) {
            return false;
        }

        visited.insert(id);
        rec_stack.insert(id);

        if let Some(resource) = resources.get(&id) {
            for &dep in &resource.dependencies {
                if self.dfs_cycle(dep, resources, visited, rec_stack) {
                    return true;
                }
            }
        }

        rec_stack.shift_remove(&id);
        false
    }

    /// Depth-first post-order over an acyclic, complete set
    fn order(&self, resources: &IndexMap<ResourceId, Resource>) -> Vec<ResourceId> {
        fn visit(
            id: ResourceId,
            resources: &IndexMap<ResourceId, Resource>,
            placed: &mut IndexSet<ResourceId>,
        ) {
            if placed.contains(&id) {
                return;
            }
            if let Some(resource) = resources.get(&id) {
                for &dep in &resource.dependencies {
                    visit(dep, resources, placed);
                }
            }
            placed.insert(id);
        }

        let mut placed = IndexSet::with_capacity(resources.len());
        for &id in resources.keys() {
            visit(id, resources, &mut placed);
        }
        placed.into_iter().collect()
    }
}

impl Default for GraphValidator {
    fn default() -> Self {
        Self::new()
    }
}
