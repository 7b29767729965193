//! SCHEDSTACK Core Types
//!
//! This crate contains pure types and logic with no I/O.
//! Everything here is shared by the planner, the notification engine
//! and the provisioning boundary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod tags;

// Re-exports
pub use capability::{Capability, CapabilitySet};
pub use config::{Config, ConfigValidator};
pub use error::{StackError, StackResult};
pub use hash::{Digest, DigestError};
pub use id::{ResourceId, StackId};
pub use tags::Tags;
