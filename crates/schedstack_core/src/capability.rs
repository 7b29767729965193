//! Capability catalog for execution identities.
//!
//! A capability is a named permission grant that the provisioning engine
//! resolves to a managed policy. Only references present in the catalog
//! below are accepted.

use crate::error::{StackError, StackResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A managed permission grant known to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Capability {
    /// Full access to metrics and alarms
    CloudWatchFullAccess,
    /// Full access to log groups and streams
    CloudWatchLogsFullAccess,
    /// Pull images from the container registry
    RegistryReadOnly,
    /// Baseline permissions for the task execution agent
    TaskExecution,
    /// Write trace segments to the tracing daemon
    TraceDaemonWrite,
    /// Push and pull images from the container registry
    RegistryPowerUser,
}

impl Capability {
    /// Every capability in the catalog, in catalog order
    pub const CATALOG: [Capability; 6] = [
        Self::CloudWatchFullAccess,
        Self::CloudWatchLogsFullAccess,
        Self::RegistryReadOnly,
        Self::TaskExecution,
        Self::TraceDaemonWrite,
        Self::RegistryPowerUser,
    ];

    /// The managed-policy reference for this capability
    #[must_use]
    pub fn reference(&self) -> &'static str {
        match self {
            Self::CloudWatchFullAccess => "CloudWatchFullAccess",
            Self::CloudWatchLogsFullAccess => "CloudWatchLogsFullAccess",
            Self::RegistryReadOnly => "AmazonEC2ContainerRegistryReadOnly",
            Self::TaskExecution => "service-role/AmazonECSTaskExecutionRolePolicy",
            Self::TraceDaemonWrite => "AWSXRayDaemonWriteAccess",
            Self::RegistryPowerUser => "AmazonEC2ContainerRegistryPowerUser",
        }
    }

    /// Resolve a managed-policy reference against the catalog
    ///
    /// # Errors
    ///
    /// Returns `UnknownCapability` if the reference is not in the catalog
    pub fn resolve(reference: &str) -> StackResult<Self> {
        Self::CATALOG
            .into_iter()
            .find(|cap| cap.reference() == reference)
            .ok_or_else(|| StackError::UnknownCapability {
                reference: reference.to_string(),
            })
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reference())
    }
}

impl From<Capability> for String {
    fn from(capability: Capability) -> Self {
        capability.reference().to_string()
    }
}

impl TryFrom<String> for Capability {
    type Error = StackError;

    fn try_from(reference: String) -> Result<Self, Self::Error> {
        Self::resolve(&reference)
    }
}

/// A set of capabilities granted to an identity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilitySet {
    /// Granted capabilities
    pub capabilities: BTreeSet<Capability>,
}

impl CapabilitySet {
    /// Create a new empty capability set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every reference and collect them into a set
    ///
    /// # Errors
    ///
    /// Returns `UnknownCapability` for the first unresolved reference
    pub fn resolve_all<S: AsRef<str>>(references: &[S]) -> StackResult<Self> {
        let mut set = Self::new();
        for reference in references {
            set.grant(Capability::resolve(reference.as_ref())?);
        }
        Ok(set)
    }

    /// Grant a capability
    pub fn grant(&mut self, capability: Capability) {
        self.capabilities.insert(capability);
    }

    /// Check if a specific capability is granted
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Get the number of capabilities
    #[must_use]
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Iterate over capabilities
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    /// Managed-policy references, in catalog order
    #[must_use]
    pub fn references(&self) -> Vec<&'static str> {
        self.capabilities.iter().map(Capability::reference).collect()
    }
}
