//! Compute cluster bound to a network topology.

use crate::network::NetworkTopology;
use schedstack_core::{ResourceId, StackError, StackId, StackResult};
use serde::{Deserialize, Serialize};

/// Logical execution cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeCluster {
    /// Resource id
    pub id: ResourceId,
    /// Cluster name
    pub name: String,
    /// Network the cluster runs in
    pub network: ResourceId,
    /// Container insights enabled
    pub observability_enabled: bool,
}

/// Builder for [`ComputeCluster`]
#[derive(Debug, Clone)]
pub struct ComputeClusterBuilder {
    name: String,
    observability_enabled: bool,
}

impl ComputeClusterBuilder {
    /// Start a cluster with observability off
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            observability_enabled: false,
        }
    }

    /// Toggle container insights
    #[must_use]
    pub fn with_observability(mut self, enabled: bool) -> Self {
        self.observability_enabled = enabled;
        self
    }

    /// Bind the cluster to `network`
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is empty
    pub fn build(&self, stack: &StackId, network: &NetworkTopology) -> StackResult<ComputeCluster> {
        if self.name.trim().is_empty() {
            return Err(StackError::validation("cluster.name", "must not be empty"));
        }
        Ok(ComputeCluster {
            id: ResourceId::derive(stack, "Cluster", &self.name),
            name: self.name.clone(),
            network: network.id,
            observability_enabled: self.observability_enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{AccessClass, Ipv4Cidr, NetworkTopologyBuilder, SubnetTierSpec};

    fn network(stack: &StackId) -> NetworkTopology {
        NetworkTopologyBuilder::new("ContainerVpc", Ipv4Cidr::parse("10.0.0.0/16").unwrap())
            .with_tier(SubnetTierSpec::new("data", 24, AccessClass::PrivateIsolated))
            .build(stack)
            .unwrap()
    }

    #[test]
    fn test_cluster_bound_to_network() {
        let stack = StackId::new("s");
        let network = network(&stack);
        let cluster = ComputeClusterBuilder::new("scheduled-task-cluster")
            .with_observability(true)
            .build(&stack, &network)
            .unwrap();
        assert_eq!(cluster.network, network.id);
        assert!(cluster.observability_enabled);
        assert_eq!(cluster.id, ResourceId::derive(&stack, "Cluster", "scheduled-task-cluster"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let stack = StackId::new("s");
        let result = ComputeClusterBuilder::new(" ").build(&stack, &network(&stack));
        assert!(matches!(result, Err(StackError::Validation { .. })));
    }
}
