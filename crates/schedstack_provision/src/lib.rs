//! SCHEDSTACK Provisioning
//!
//! The boundary between the planner and whatever realizes a resource graph.
//! Ships a manifest engine that records each applied graph as JSON and diffs
//! new graphs against the last recorded one.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod diff;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod state;

pub use context::DeployContext;
pub use diff::{ChangeKind, ChangeSet, resource_digest};
pub use engine::{Deployed, ProvisioningEngine};
pub use error::{ProvisionError, ProvisionResult};
pub use manifest::{Manifest, ManifestEngine, ManifestEntry};
pub use state::CurrentState;
