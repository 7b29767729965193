//! The provisioning boundary.

use crate::context::DeployContext;
use crate::diff::ChangeSet;
use crate::error::ProvisionResult;
use crate::state::CurrentState;
use schedstack_core::{Digest, StackId};
use schedstack_plan::ResourceGraph;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of applying a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployed {
    /// Stack that was applied
    pub stack: StackId,
    /// Digest of the applied graph
    pub digest: Digest,
    /// Changes relative to the state before applying
    pub changes: ChangeSet,
    /// Where the engine recorded the result, if it records one
    pub location: Option<PathBuf>,
}

/// Realizes resource graphs
///
/// Engines receive only graphs that passed validation; errors they raise are
/// reported to the caller unchanged.
pub trait ProvisioningEngine {
    /// What is currently deployed for `stack`
    ///
    /// # Errors
    ///
    /// Returns error if recorded state cannot be read
    fn current(&self, stack: &StackId) -> ProvisionResult<CurrentState>;

    /// Create, update or delete resources until `graph` is deployed
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot realize the graph
    fn apply(&self, graph: &ResourceGraph, ctx: &DeployContext) -> ProvisionResult<Deployed>;

    /// Changes `apply` would make against `current`
    fn diff(&self, graph: &ResourceGraph, current: &CurrentState) -> ChangeSet {
        ChangeSet::compute(graph, current)
    }
}
