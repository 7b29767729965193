//! Recorded state of a previously applied graph.

use crate::diff::resource_digest;
use crate::error::{ProvisionError, ProvisionResult};
use crate::manifest::Manifest;
use indexmap::IndexMap;
use schedstack_core::{Digest, ResourceId, StackId};
use schedstack_plan::ResourceGraph;
use std::path::Path;

/// Per-resource digests of what is currently deployed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CurrentState {
    /// Stack the state belongs to, if anything is recorded
    pub stack: Option<StackId>,
    resources: IndexMap<ResourceId, Digest>,
}

impl CurrentState {
    /// Nothing deployed
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// State as recorded in a manifest
    #[must_use]
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            stack: Some(manifest.stack.clone()),
            resources: manifest
                .resources
                .iter()
                .map(|(id, entry)| (*id, entry.digest))
                .collect(),
        }
    }

    /// State that results from applying `graph`
    #[must_use]
    pub fn from_graph(graph: &ResourceGraph) -> Self {
        Self {
            stack: Some(graph.stack.clone()),
            resources: graph.iter().map(|r| (r.id, resource_digest(r))).collect(),
        }
    }

    /// Load the manifest at `path`; a missing file means nothing is deployed
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file exists but cannot be read, or an
    /// encoding error if it is not a manifest
    pub fn load(path: &Path) -> ProvisionResult<Self> {
        match std::fs::read(path) {
            Ok(bytes) => {
                let manifest: Manifest = serde_json::from_slice(&bytes)?;
                Ok(Self::from_manifest(&manifest))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::empty()),
            Err(err) => Err(ProvisionError::io(path, err)),
        }
    }

    /// Recorded digest of `id`
    #[must_use]
    pub fn digest_of(&self, id: ResourceId) -> Option<Digest> {
        self.resources.get(&id).copied()
    }

    /// Recorded ids in application order
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = ResourceId> + '_ {
        self.resources.keys().copied()
    }

    /// Number of recorded resources
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check whether nothing is recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_manifest_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = CurrentState::load(&dir.path().join("absent.manifest.json")).unwrap();
        assert!(state.is_empty());
        assert_eq!(state.stack, None);
    }

    #[test]
    fn test_garbage_manifest_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.manifest.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(CurrentState::load(&path), Err(ProvisionError::Encoding(_))));
    }
}
