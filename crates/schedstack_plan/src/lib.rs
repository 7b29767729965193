//! SCHEDSTACK Planner
//!
//! Builders that derive each infrastructure object of a scheduled job stack,
//! and the assembler that composes them into one tagged, dependency-ordered
//! resource graph.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assemble;
pub mod blueprint;
pub mod cluster;
pub mod graph;
pub mod identity;
pub mod network;
pub mod schedule;
pub mod task;
pub mod validate;

pub use assemble::ResourceGraphAssembler;
pub use blueprint::{
    ContainerBlueprint, NetworkBlueprint, NotificationBlueprint, ScheduleBlueprint, StackBlueprint,
    StackBuilder,
};
pub use cluster::{ComputeCluster, ComputeClusterBuilder};
pub use graph::{Resource, ResourceGraph, ResourceKind};
pub use identity::{Identity, IdentityPair, IdentityProvisioner, IdentityRole};
pub use network::{AccessClass, Ipv4Cidr, NetworkTopology, NetworkTopologyBuilder, SubnetTierSpec};
pub use schedule::{CronField, CronFields, PlatformVersion, ScheduleTrigger, ScheduleTriggerBuilder};
pub use task::{ContainerDefinition, ContainerSpec, LogSink, TaskTemplate, TaskTemplateBuilder};
pub use validate::GraphValidator;
