//! Composes derived objects into a [`ResourceGraph`].

use crate::graph::{Resource, ResourceGraph, ResourceKind};
use crate::validate::GraphValidator;
use indexmap::IndexMap;
use schedstack_core::{ResourceId, StackError, StackId, StackResult, Tags};

/// Collects derived objects, tags them and validates the result
#[derive(Debug, Clone)]
pub struct ResourceGraphAssembler {
    stack: StackId,
    tags: Tags,
    resources: IndexMap<ResourceId, Resource>,
    validator: GraphValidator,
}

impl ResourceGraphAssembler {
    /// Start an empty graph for `stack`; every member will carry `tags`
    #[must_use]
    pub fn new(stack: StackId, tags: Tags) -> Self {
        Self {
            stack,
            tags,
            resources: IndexMap::new(),
            validator: GraphValidator::new(),
        }
    }

    /// Replace the validator
    #[must_use]
    pub fn with_validator(mut self, validator: GraphValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Add a derived object
    ///
    /// Dependencies may be added in any order; they are checked on assembly.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateResource` if the id is already present
    pub fn add(&mut self, object: impl Into<ResourceKind>) -> StackResult<ResourceId> {
        let resource = Resource::new(object.into(), self.tags.clone());
        let id = resource.id;
        if self.resources.contains_key(&id) {
            return Err(StackError::DuplicateResource { id: id.to_string() });
        }
        tracing::debug!(
            resource = %resource.logical_name,
            kind = resource.kind.type_name(),
            %id,
            "added resource"
        );
        self.resources.insert(id, resource);
        Ok(id)
    }

    /// Number of resources added so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check whether nothing has been added
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Validate and freeze the graph
    ///
    /// # Errors
    ///
    /// Returns `IncompleteGraph` if a member references an id that was never
    /// added, or `CycleDetected` if dependencies loop
    pub fn assemble(self) -> StackResult<ResourceGraph> {
        let order = self.validator.validate(&self.resources, &self.tags)?;

        let mut unordered = self.resources;
        let mut resources = IndexMap::with_capacity(order.len());
        for id in order {
            if let Some(resource) = unordered.shift_remove(&id) {
                resources.insert(id, resource);
            }
        }

        let graph = ResourceGraph {
            stack: self.stack,
            tags: self.tags,
            resources,
        };
        tracing::info!(
            stack = %graph.stack,
            resources = graph.len(),
            digest = %graph.digest().short(),
            "assembled resource graph"
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ComputeClusterBuilder;
    use crate::identity::{IdentityPair, IdentityProvisioner};
    use crate::network::{AccessClass, Ipv4Cidr, NetworkTopology, NetworkTopologyBuilder, SubnetTierSpec};
    use crate::schedule::ScheduleTriggerBuilder;
    use crate::task::{ContainerDefinition, LogSink, TaskTemplate, TaskTemplateBuilder};

    fn stack() -> StackId {
        StackId::new("ScheduledFargateStack")
    }

    fn tags() -> Tags {
        Tags::new("dev", "cc-42")
    }

    fn network() -> NetworkTopology {
        NetworkTopologyBuilder::new("ContainerVpc", Ipv4Cidr::parse("172.31.0.0/16").unwrap())
            .with_tier(SubnetTierSpec::new("data", 20, AccessClass::PrivateIsolated))
            .build(&stack())
            .unwrap()
    }

    fn identities() -> IdentityPair {
        IdentityProvisioner::new("svc")
            .provision(&stack(), &["CloudWatchLogsFullAccess"], &["CloudWatchFullAccess"])
            .unwrap()
    }

    fn template(ids: &IdentityPair) -> TaskTemplate {
        TaskTemplateBuilder::new("svc")
            .with_container(
                ContainerDefinition::new("Container", "amazonlinux:2", LogSink::new("g", "p"))
                    .with_command(["sleep", "1"]),
            )
            .build(&stack(), &ids.execution, &ids.task)
            .unwrap()
    }

    #[test]
    fn test_assembles_in_dependency_order() {
        let network = network();
        let cluster = ComputeClusterBuilder::new("cluster").build(&stack(), &network).unwrap();
        let ids = identities();
        let template = template(&ids);
        let trigger = ScheduleTriggerBuilder::new("trigger")
            .with_cron("0", "15", "*", "*")
            .build(&stack(), &cluster, &template)
            .unwrap();

        let mut assembler = ResourceGraphAssembler::new(stack(), tags());
        // Deliberately reversed.
        assembler.add(trigger.clone()).unwrap();
        assembler.add(template.clone()).unwrap();
        assembler.add(ids.task.clone()).unwrap();
        assembler.add(ids.execution.clone()).unwrap();
        assembler.add(cluster.clone()).unwrap();
        assembler.add(network.clone()).unwrap();
        let graph = assembler.assemble().unwrap();

        assert_eq!(graph.len(), 6);
        let position = |id: ResourceId| graph.resources.get_index_of(&id).unwrap();
        assert!(position(network.id) < position(cluster.id));
        assert!(position(cluster.id) < position(trigger.id));
        assert!(position(ids.execution.id) < position(template.id));
        assert!(position(ids.task.id) < position(template.id));
        assert!(position(template.id) < position(trigger.id));
        assert!(graph.iter().all(|r| r.tags == tags()));
        assert_eq!(graph.dependents(template.id), vec![trigger.id]);
    }

    #[test]
    fn test_template_with_unknown_identity_is_incomplete() {
        let ids = identities();
        let template = template(&ids);

        let mut assembler = ResourceGraphAssembler::new(stack(), tags());
        assembler.add(ids.execution).unwrap();
        assembler.add(template).unwrap();
        let err = assembler.assemble().unwrap_err();
        assert!(matches!(err, StackError::IncompleteGraph { ref resource, .. } if resource == "svc"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut assembler = ResourceGraphAssembler::new(stack(), tags());
        assembler.add(network()).unwrap();
        let err = assembler.add(network()).unwrap_err();
        assert!(matches!(err, StackError::DuplicateResource { .. }));
        assert_eq!(assembler.len(), 1);
    }

    #[test]
    fn test_empty_graph() {
        let graph = ResourceGraphAssembler::new(stack(), tags()).assemble().unwrap();
        assert!(graph.is_empty());
    }
}
