//! Identifiers for SCHEDSTACK entities.
//!
//! Resource ids are name-based UUIDs (v5) so that deriving the same stack
//! twice yields the same ids. The name hashed is the stack, the resource kind
//! and the logical name, each length-prefixed so no two triples collide.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for all resource ids
const RESOURCE_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0x2f, 0x1c, 0x5e, 0x93, 0x4a, 0x4d, 0x0b, 0x8e, 0x21, 0x7a, 0xc4, 0x55, 0x0f, 0x3d, 0x91,
]);

/// Deployment identifier - names one stack, e.g. `ScheduledFargateStack`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StackId(String);

impl StackId {
    /// Create a stack id
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get as str
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource identifier - identifies one member of the resource graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(Uuid);

impl ResourceId {
    /// Derive the id of a logical resource of `kind` within a stack
    #[must_use]
    pub fn derive(stack: &StackId, kind: &str, logical_name: &str) -> Self {
        let mut name = Vec::with_capacity(24 + stack.0.len() + kind.len() + logical_name.len());
        for part in [stack.as_str(), kind, logical_name] {
            name.extend_from_slice(&(part.len() as u64).to_be_bytes());
            name.extend_from_slice(part.as_bytes());
        }
        Self(Uuid::new_v5(&RESOURCE_NAMESPACE, &name))
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "res_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let stack = StackId::new("ScheduledFargateStack");
        let a = ResourceId::derive(&stack, "Network", "ContainerVpc");
        let b = ResourceId::derive(&stack, "Network", "ContainerVpc");
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_separates_names_and_stacks() {
        let stack = StackId::new("ScheduledFargateStack");
        let other = StackId::new("OtherStack");
        let vpc = ResourceId::derive(&stack, "Network", "ContainerVpc");

        assert_ne!(vpc, ResourceId::derive(&stack, "Network", "Cluster"));
        assert_ne!(vpc, ResourceId::derive(&other, "Network", "ContainerVpc"));
    }

    #[test]
    fn test_derive_separates_kinds() {
        let stack = StackId::new("s");
        assert_ne!(
            ResourceId::derive(&stack, "Network", "shared"),
            ResourceId::derive(&stack, "Cluster", "shared")
        );
    }

    #[test]
    fn test_derive_is_unambiguous_across_separators() {
        assert_ne!(
            ResourceId::derive(&StackId::new("a/b"), "Network", "c"),
            ResourceId::derive(&StackId::new("a"), "Network", "b/c")
        );
        assert_ne!(
            ResourceId::derive(&StackId::new("a"), "Net", "workx"),
            ResourceId::derive(&StackId::new("a"), "Network", "x")
        );
    }

    #[test]
    fn test_display_prefix() {
        let id = ResourceId::from_bytes([0u8; 16]);
        assert_eq!(
            id.to_string(),
            "res_00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(StackId::new("s").to_string(), "s");
    }

    #[test]
    fn test_serde_roundtrip_keeps_id() {
        let id = ResourceId::derive(&StackId::new("s"), "Network", "r");
        let json = serde_json::to_string(&id).unwrap();
        let back: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
