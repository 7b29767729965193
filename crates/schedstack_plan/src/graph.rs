//! Resource graph handed to the provisioning engine.
//!
//! Every member lists the ids it depends on. The graph stores members in
//! dependency-first order and is never mutated once assembled.

use crate::cluster::ComputeCluster;
use crate::identity::Identity;
use crate::network::NetworkTopology;
use crate::schedule::ScheduleTrigger;
use crate::task::TaskTemplate;
use indexmap::{IndexMap, IndexSet};
use schedstack_core::{Digest, ResourceId, StackId, StackResult, Tags};
use schedstack_notify::{Channel, NotificationRouter, NotificationRule};
use serde::{Deserialize, Serialize};

/// The declared object behind a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties")]
pub enum ResourceKind {
    /// Network topology
    Network(NetworkTopology),
    /// Compute cluster
    Cluster(ComputeCluster),
    /// Execution or task identity
    Identity(Identity),
    /// Task template
    TaskTemplate(TaskTemplate),
    /// Schedule trigger
    ScheduleTrigger(ScheduleTrigger),
    /// Notification channel
    Channel(Channel),
    /// Notification rule
    NotificationRule(NotificationRule),
}

impl ResourceKind {
    /// Id of the declared object
    #[must_use]
    pub fn id(&self) -> ResourceId {
        match self {
            Self::Network(n) => n.id,
            Self::Cluster(c) => c.id,
            Self::Identity(i) => i.id,
            Self::TaskTemplate(t) => t.id,
            Self::ScheduleTrigger(s) => s.id,
            Self::Channel(c) => c.id,
            Self::NotificationRule(r) => r.id,
        }
    }

    /// Name the object was declared under
    #[must_use]
    pub fn logical_name(&self) -> &str {
        match self {
            Self::Network(n) => &n.name,
            Self::Cluster(c) => &c.name,
            Self::Identity(i) => &i.name,
            Self::TaskTemplate(t) => &t.family,
            Self::ScheduleTrigger(s) => &s.name,
            Self::Channel(c) => &c.name,
            Self::NotificationRule(r) => &r.name,
        }
    }

    /// Short type name
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Network(_) => "Network",
            Self::Cluster(_) => "Cluster",
            Self::Identity(_) => "Identity",
            Self::TaskTemplate(_) => "TaskTemplate",
            Self::ScheduleTrigger(_) => "ScheduleTrigger",
            Self::Channel(_) => "Channel",
            Self::NotificationRule(_) => "NotificationRule",
        }
    }

    /// Ids this object refers to
    #[must_use]
    pub fn references(&self) -> Vec<ResourceId> {
        match self {
            Self::Network(_) | Self::Identity(_) | Self::Channel(_) => Vec::new(),
            Self::Cluster(c) => vec![c.network],
            Self::TaskTemplate(t) => vec![t.execution_identity, t.task_identity],
            Self::ScheduleTrigger(s) => vec![s.target_cluster, s.target_template],
            Self::NotificationRule(r) => vec![r.target_channel],
        }
    }
}

impl From<NetworkTopology> for ResourceKind {
    fn from(value: NetworkTopology) -> Self {
        Self::Network(value)
    }
}

impl From<ComputeCluster> for ResourceKind {
    fn from(value: ComputeCluster) -> Self {
        Self::Cluster(value)
    }
}

impl From<Identity> for ResourceKind {
    fn from(value: Identity) -> Self {
        Self::Identity(value)
    }
}

impl From<TaskTemplate> for ResourceKind {
    fn from(value: TaskTemplate) -> Self {
        Self::TaskTemplate(value)
    }
}

impl From<ScheduleTrigger> for ResourceKind {
    fn from(value: ScheduleTrigger) -> Self {
        Self::ScheduleTrigger(value)
    }
}

impl From<Channel> for ResourceKind {
    fn from(value: Channel) -> Self {
        Self::Channel(value)
    }
}

impl From<NotificationRule> for ResourceKind {
    fn from(value: NotificationRule) -> Self {
        Self::NotificationRule(value)
    }
}

/// A member of the resource graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource id
    pub id: ResourceId,
    /// Declared name
    pub logical_name: String,
    /// Declared object
    pub kind: ResourceKind,
    /// Ids that must exist first
    pub dependencies: IndexSet<ResourceId>,
    /// Tag pair
    pub tags: Tags,
}

impl Resource {
    /// Wrap a declared object, deriving its dependencies from its references
    #[must_use]
    pub fn new(kind: ResourceKind, tags: Tags) -> Self {
        Self {
            id: kind.id(),
            logical_name: kind.logical_name().to_string(),
            dependencies: kind.references().into_iter().collect(),
            kind,
            tags,
        }
    }
}

/// Complete, tagged, dependency-ordered set of resources of one stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGraph {
    /// Deployment identifier
    pub stack: StackId,
    /// Tag pair carried by every member
    pub tags: Tags,
    /// Members, dependencies first
    pub resources: IndexMap<ResourceId, Resource>,
}

impl ResourceGraph {
    /// Get resource by id
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    /// Find a resource by logical name
    #[must_use]
    pub fn find(&self, logical_name: &str) -> Option<&Resource> {
        self.resources.values().find(|r| r.logical_name == logical_name)
    }

    /// Iterate in dependency order
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Resources that depend on the given one
    #[must_use]
    pub fn dependents(&self, id: ResourceId) -> Vec<ResourceId> {
        self.resources
            .values()
            .filter(|r| r.dependencies.contains(&id))
            .map(|r| r.id)
            .collect()
    }

    /// Resources the given one depends on
    #[must_use]
    pub fn dependencies(&self, id: ResourceId) -> Vec<ResourceId> {
        self.resources
            .get(&id)
            .map(|r| r.dependencies.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of resources of a type
    #[must_use]
    pub fn count_of(&self, type_name: &str) -> usize {
        self.resources
            .values()
            .filter(|r| r.kind.type_name() == type_name)
            .count()
    }

    /// Total resource count
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if the graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Router over the graph's channels and notification rules
    ///
    /// # Errors
    ///
    /// Returns `IncompleteGraph` if a rule targets a channel outside the graph
    pub fn router(&self) -> StackResult<NotificationRouter> {
        let mut channels = Vec::new();
        let mut rules = Vec::new();
        for resource in self.resources.values() {
            match &resource.kind {
                ResourceKind::Channel(channel) => channels.push(channel.clone()),
                ResourceKind::NotificationRule(rule) => rules.push(rule.clone()),
                _ => {}
            }
        }
        NotificationRouter::new(channels, rules)
    }

    /// Content digest of the whole graph
    ///
    /// Every member encodes to JSON with string keys, so the fallback digest
    /// of empty input is unreachable.
    #[must_use]
    pub fn digest(&self) -> Digest {
        Digest::of_json(self).unwrap_or_else(|_| Digest::compute(&[]))
    }
}
