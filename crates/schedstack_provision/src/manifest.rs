//! Engine that records applied graphs as JSON manifests.
//!
//! One manifest per stack lives at `<out>/<stack>.manifest.json`. Applying a
//! graph diffs it against the manifest already there and then replaces it.

use crate::context::DeployContext;
use crate::diff::{ChangeSet, resource_digest};
use crate::engine::{Deployed, ProvisioningEngine};
use crate::error::{ProvisionError, ProvisionResult};
use crate::state::CurrentState;
use indexmap::IndexMap;
use schedstack_core::{Digest, ResourceId, StackId};
use schedstack_plan::ResourceGraph;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Recorded summary of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Declared name
    pub logical_name: String,
    /// Resource type
    pub kind: String,
    /// Content digest
    pub digest: Digest,
    /// Ids it depends on
    pub dependencies: Vec<ResourceId>,
}

/// A recorded deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Stack identifier
    pub stack: StackId,
    /// Digest of the whole graph
    pub digest: Digest,
    /// Target the graph was applied to
    pub context: DeployContext,
    /// Per-resource summaries, application order
    pub resources: IndexMap<ResourceId, ManifestEntry>,
    /// The full graph
    pub graph: ResourceGraph,
}

impl Manifest {
    /// Record `graph` as applied to `ctx`
    #[must_use]
    pub fn from_graph(graph: &ResourceGraph, ctx: &DeployContext) -> Self {
        let resources = graph
            .iter()
            .map(|r| {
                let entry = ManifestEntry {
                    logical_name: r.logical_name.clone(),
                    kind: r.kind.type_name().to_string(),
                    digest: resource_digest(r),
                    dependencies: r.dependencies.iter().copied().collect(),
                };
                (r.id, entry)
            })
            .collect();

        Self {
            stack: graph.stack.clone(),
            digest: graph.digest(),
            context: ctx.clone(),
            resources,
            graph: graph.clone(),
        }
    }
}

/// Writes manifests into an output directory
#[derive(Debug, Clone)]
pub struct ManifestEngine {
    out_dir: PathBuf,
}

impl ManifestEngine {
    /// Engine writing into `out_dir`; the directory is created on first apply
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Output directory
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Manifest location for `stack`
    #[must_use]
    pub fn manifest_path(&self, stack: &StackId) -> PathBuf {
        self.out_dir.join(format!("{stack}.manifest.json"))
    }

    /// Read the manifest of `stack`, if one was written
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or decoded
    pub fn read(&self, stack: &StackId) -> ProvisionResult<Option<Manifest>> {
        let path = self.manifest_path(stack);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ProvisionError::io(path, err)),
        }
    }

    fn write(&self, path: &Path, manifest: &Manifest) -> ProvisionResult<()> {
        std::fs::create_dir_all(&self.out_dir).map_err(|e| ProvisionError::io(&self.out_dir, e))?;

        let bytes = serde_json::to_vec_pretty(manifest)?;
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, bytes).map_err(|e| ProvisionError::io(&staging, e))?;
        std::fs::rename(&staging, path).map_err(|e| ProvisionError::io(path, e))
    }
}

impl ProvisioningEngine for ManifestEngine {
    fn current(&self, stack: &StackId) -> ProvisionResult<CurrentState> {
        let path = self.manifest_path(stack);
        let state = CurrentState::load(&path)?;
        match &state.stack {
            Some(found) if found != stack => Err(ProvisionError::StackMismatch {
                path,
                expected: stack.to_string(),
                found: found.to_string(),
            }),
            _ => Ok(state),
        }
    }

    fn apply(&self, graph: &ResourceGraph, ctx: &DeployContext) -> ProvisionResult<Deployed> {
        if graph.is_empty() {
            return Err(ProvisionError::Rejected {
                reason: format!("stack '{}' has no resources", graph.stack),
            });
        }

        let current = self.current(&graph.stack)?;
        let changes = self.diff(graph, &current);
        let path = self.manifest_path(&graph.stack);

        let manifest = Manifest::from_graph(graph, ctx);
        self.write(&path, &manifest)?;

        tracing::info!(
            stack = %graph.stack,
            target = %ctx,
            digest = %manifest.digest.short(),
            changes = %changes,
            path = %path.display(),
            "applied resource graph"
        );

        Ok(Deployed {
            stack: graph.stack.clone(),
            digest: manifest.digest,
            changes,
            location: Some(path),
        })
    }
}
