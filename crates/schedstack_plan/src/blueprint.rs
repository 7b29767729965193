//! Fixed inputs of a stack and the end-to-end build pipeline.
//!
//! A [`StackBlueprint`] holds everything that is not read from the
//! configuration file. [`StackBuilder`] runs each builder in dependency order
//! and hands the results to the assembler.

use crate::assemble::ResourceGraphAssembler;
use crate::cluster::ComputeClusterBuilder;
use crate::graph::ResourceGraph;
use crate::identity::IdentityProvisioner;
use crate::network::{
    AccessClass, DEFAULT_ADDRESS_BLOCK, Ipv4Cidr, NetworkTopologyBuilder, SubnetTierSpec,
};
use crate::schedule::{PlatformVersion, ScheduleTriggerBuilder};
use crate::task::{ContainerDefinition, LogSink, TaskTemplateBuilder};
use schedstack_core::{Capability, Config, StackError, StackId, StackResult, Tags};
use schedstack_notify::{Channel, LifecycleTransition, NotificationRuleEngine};
use serde::{Deserialize, Serialize};

/// Network section of a blueprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkBlueprint {
    /// Topology name
    pub name: String,
    /// Address block
    pub address_block: Ipv4Cidr,
    /// Availability zones
    pub zones: u8,
    /// NAT gateways
    pub nat_gateways: u8,
    /// Subnet tiers, allocated in order
    pub tiers: Vec<SubnetTierSpec>,
}

/// Container section of a blueprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerBlueprint {
    /// Container name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Entry command
    pub command: Vec<String>,
    /// Extra environment; `StackId` is always added
    pub environment: Vec<(String, String)>,
    /// Existing log group
    pub log_group: String,
}

/// Schedule section of a blueprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBlueprint {
    /// Trigger name
    pub name: String,
    /// Minute field
    pub minute: String,
    /// Hour field
    pub hour: String,
    /// Day-of-month field
    pub day: String,
    /// Month field
    pub month: String,
    /// Runtime platform
    pub platform_version: PlatformVersion,
}

/// Notification section of a blueprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationBlueprint {
    /// Channel name
    pub channel: String,
    /// Transitions that get a rule
    pub transitions: Vec<LifecycleTransition>,
}

/// Everything about a stack that does not come from [`Config`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackBlueprint {
    /// Deployment identifier
    pub stack_name: String,
    /// Service name; names the identities and the task family
    pub service_name: String,
    /// Network
    pub network: NetworkBlueprint,
    /// Cluster name
    pub cluster_name: String,
    /// Container insights on the cluster
    pub container_insights: bool,
    /// Capabilities of the execution identity
    pub execution_capabilities: Vec<String>,
    /// Capabilities of the task identity
    pub task_capabilities: Vec<String>,
    /// The job container
    pub container: ContainerBlueprint,
    /// Recurring schedule
    pub schedule: ScheduleBlueprint,
    /// Lifecycle notifications
    pub notifications: NotificationBlueprint,
}

impl Default for StackBlueprint {
    fn default() -> Self {
        let references = |caps: &[Capability]| -> Vec<String> {
            caps.iter().map(|c| c.reference().to_string()).collect()
        };

        Self {
            stack_name: "ScheduledFargateStack".to_string(),
            service_name: "ScheduledServiceTasks".to_string(),
            network: NetworkBlueprint {
                name: "ContainerVpc".to_string(),
                address_block: DEFAULT_ADDRESS_BLOCK,
                zones: 3,
                nat_gateways: 1,
                tiers: vec![
                    SubnetTierSpec::new("public", 20, AccessClass::Public),
                    SubnetTierSpec::new("application", 20, AccessClass::PrivateWithEgress),
                    SubnetTierSpec::new("data", 20, AccessClass::PrivateIsolated),
                ],
            },
            cluster_name: "scheduled-task-cluster".to_string(),
            container_insights: true,
            execution_capabilities: references(&[
                Capability::CloudWatchFullAccess,
                Capability::CloudWatchLogsFullAccess,
                Capability::RegistryReadOnly,
                Capability::TaskExecution,
            ]),
            task_capabilities: references(&[
                Capability::CloudWatchFullAccess,
                Capability::TraceDaemonWrite,
                Capability::TaskExecution,
                Capability::RegistryPowerUser,
            ]),
            container: ContainerBlueprint {
                name: "Container".to_string(),
                image: "amazonlinux:2".to_string(),
                command: vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    "echo 'starting task execution'  && echo \"StackId is: $StackId\" \
                     && sleep 180 && echo 'completed task execution'"
                        .to_string(),
                ],
                environment: Vec::new(),
                log_group: "/aws/ecs/scheduledTaskApp".to_string(),
            },
            schedule: ScheduleBlueprint {
                name: "AmazonLinuxSleepTask".to_string(),
                minute: "00".to_string(),
                hour: "15".to_string(),
                day: "*".to_string(),
                month: "*".to_string(),
                platform_version: PlatformVersion::Latest,
            },
            notifications: NotificationBlueprint {
                channel: "TaskStateAlert".to_string(),
                transitions: vec![
                    LifecycleTransition::StoppedEssentialExit,
                    LifecycleTransition::Started,
                ],
            },
        }
    }
}

/// Builds the resource graph of one stack
#[derive(Debug, Clone, Default)]
pub struct StackBuilder {
    blueprint: StackBlueprint,
}

impl StackBuilder {
    /// Create a builder over `blueprint`
    #[must_use]
    pub fn new(blueprint: StackBlueprint) -> Self {
        Self { blueprint }
    }

    /// The blueprint in use
    #[must_use]
    pub fn blueprint(&self) -> &StackBlueprint {
        &self.blueprint
    }

    /// Run every builder against `config` and assemble the graph
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a builder or by assembly
    pub fn build(&self, config: &Config) -> StackResult<ResourceGraph> {
        let bp = &self.blueprint;
        check_stack_name(&bp.stack_name)?;
        let stack = StackId::new(bp.stack_name.clone());
        let tags = Tags::from(config);

        for field in config.missing_optional_fields() {
            tracing::warn!(field, "optional configuration field is empty; tag value will be empty");
        }

        let mut network = NetworkTopologyBuilder::new(bp.network.name.clone(), bp.network.address_block)
            .with_zones(bp.network.zones)
            .with_nat_gateways(bp.network.nat_gateways);
        for tier in &bp.network.tiers {
            network = network.with_tier(tier.clone());
        }
        let network = network.build(&stack)?;

        let cluster = ComputeClusterBuilder::new(bp.cluster_name.clone())
            .with_observability(bp.container_insights)
            .build(&stack, &network)?;

        let identities = IdentityProvisioner::new(bp.service_name.clone()).provision(
            &stack,
            &bp.execution_capabilities,
            &bp.task_capabilities,
        )?;

        let mut container = ContainerDefinition::new(
            bp.container.name.clone(),
            bp.container.image.clone(),
            LogSink::for_stack(bp.container.log_group.clone(), &stack),
        )
        .with_command(bp.container.command.iter().cloned());
        for (key, value) in &bp.container.environment {
            container = container.with_env(key.clone(), value.clone());
        }
        let template = TaskTemplateBuilder::new(bp.service_name.clone())
            .with_container(container)
            .build(&stack, &identities.execution, &identities.task)?;

        let schedule = &bp.schedule;
        let trigger = ScheduleTriggerBuilder::new(schedule.name.clone())
            .with_cron(
                schedule.minute.clone(),
                schedule.hour.clone(),
                schedule.day.clone(),
                schedule.month.clone(),
            )
            .with_platform_version(schedule.platform_version)
            .build(&stack, &cluster, &template)?;

        let mut assembler = ResourceGraphAssembler::new(stack.clone(), tags);
        assembler.add(network)?;
        assembler.add(cluster)?;
        assembler.add(identities.execution)?;
        assembler.add(identities.task)?;
        assembler.add(template)?;
        assembler.add(trigger)?;

        if config.notifications {
            let channel = Channel::new(&stack, &bp.notifications.channel, &[config.email.as_str()])?;
            let rules = NotificationRuleEngine::new(stack.clone())
                .derive(&channel, &bp.notifications.transitions)?;
            assembler.add(channel)?;
            for rule in rules {
                assembler.add(rule)?;
            }
        } else {
            tracing::info!(%stack, "notifications disabled; skipping channel and rules");
        }

        assembler.assemble()
    }
}

/// Stack names become file names downstream, so they stay a single path component
fn check_stack_name(name: &str) -> StackResult<()> {
    if name.trim().is_empty() {
        return Err(StackError::validation("stack.name", "must not be empty"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(StackError::validation(
            "stack.name",
            format!("'{name}' must not contain path separators"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ResourceKind;
    use schedstack_core::{ConfigValidator, StackError};
    use schedstack_notify::LifecycleEvent;

    fn config(json: &str) -> Config {
        ConfigValidator::new().parse(json).unwrap()
    }

    fn default_config() -> Config {
        config(r#"{"Email": "ops@example.com", "Environment": "dev", "CostCenter": "cc-42"}"#)
    }

    #[test]
    fn test_default_stack() {
        let graph = StackBuilder::default().build(&default_config()).unwrap();

        assert_eq!(graph.stack.as_str(), "ScheduledFargateStack");
        assert_eq!(graph.len(), 9);
        assert_eq!(graph.count_of("Identity"), 2);
        assert_eq!(graph.count_of("NotificationRule"), 2);
        assert!(graph.iter().all(|r| r.tags == Tags::new("dev", "cc-42")));

        let Some(ResourceKind::Network(network)) = graph.find("ContainerVpc").map(|r| &r.kind) else {
            panic!("network missing");
        };
        assert_eq!(network.subnets().count(), 9);
        assert_eq!(network.address_block.to_string(), "172.31.0.0/16");

        let Some(ResourceKind::ScheduleTrigger(trigger)) =
            graph.find("AmazonLinuxSleepTask").map(|r| &r.kind)
        else {
            panic!("trigger missing");
        };
        assert_eq!(trigger.expression, "cron(0 15 * * ? *)");

        let Some(ResourceKind::TaskTemplate(template)) =
            graph.find("ScheduledServiceTasks").map(|r| &r.kind)
        else {
            panic!("template missing");
        };
        let container = &template.containers[0];
        assert_eq!(container.image, "amazonlinux:2");
        assert_eq!(
            container.environment.get("StackId").map(String::as_str),
            Some("ScheduledFargateStack")
        );
        assert_eq!(container.log_sink.stream_prefix, "ScheduledFargateStack");
    }

    #[test]
    fn test_channel_subscribes_config_email() {
        let graph = StackBuilder::default().build(&default_config()).unwrap();
        let Some(ResourceKind::Channel(channel)) = graph.find("TaskStateAlert").map(|r| &r.kind) else {
            panic!("channel missing");
        };
        let subscribers: Vec<&str> = channel.subscribers.iter().map(|s| s.as_str()).collect();
        assert_eq!(subscribers, vec!["ops@example.com"]);
    }

    #[test]
    fn test_notifications_disabled() {
        let config = config(r#"{"email": "ops@example.com", "notifications": false}"#);
        let graph = StackBuilder::default().build(&config).unwrap();
        assert_eq!(graph.len(), 6);
        assert_eq!(graph.count_of("Channel"), 0);
        assert_eq!(graph.count_of("NotificationRule"), 0);
        assert!(graph.iter().all(|r| r.tags == Tags::new("", "")));
    }

    #[test]
    fn test_same_config_same_digest() {
        let builder = StackBuilder::default();
        let a = builder.build(&default_config()).unwrap();
        let b = builder.build(&default_config()).unwrap();
        assert_eq!(a.digest(), b.digest());

        let other = config(r#"{"email": "ops@example.com", "environment": "prod"}"#);
        assert_ne!(a.digest(), builder.build(&other).unwrap().digest());
    }

    #[test]
    fn test_invalid_email_rejected_when_notifying() {
        let config = config(r#"{"email": "not-an-address"}"#);
        assert!(StackBuilder::default().build(&config).is_err());

        let config = config_off("not-an-address");
        assert!(StackBuilder::default().build(&config).is_ok());
    }

    fn config_off(email: &str) -> Config {
        config(&serde_json::json!({"email": email, "notifications": false}).to_string())
    }

    #[test]
    fn test_blueprint_errors_surface() {
        let mut blueprint = StackBlueprint::default();
        blueprint.schedule.hour = "25".to_string();
        let err = StackBuilder::new(blueprint).build(&default_config()).unwrap_err();
        assert!(matches!(err, StackError::InvalidSchedule { .. }));

        let mut blueprint = StackBlueprint::default();
        blueprint.task_capabilities.push("AmazonS3FullAccess".to_string());
        let err = StackBuilder::new(blueprint).build(&default_config()).unwrap_err();
        assert!(matches!(err, StackError::UnknownCapability { .. }));

        let mut blueprint = StackBlueprint::default();
        blueprint.network.zones = 6;
        blueprint.network.tiers[0].mask = 18;
        let err = StackBuilder::new(blueprint).build(&default_config()).unwrap_err();
        assert!(matches!(err, StackError::InvalidAddressPlan { .. }));
    }

    #[test]
    fn test_stopped_event_reaches_subscriber() {
        let graph = StackBuilder::default().build(&default_config()).unwrap();
        let router = graph.router().unwrap();
        assert_eq!(router.rule_count(), 2);

        let stopped = LifecycleEvent::task_state_change()
            .with_detail("lastStatus", "STOPPED")
            .with_detail("stoppedReason", "Essential container in task exited");
        let dispatches = router.route(&stopped);
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].rule, "TaskStoppedRule");
        assert_eq!(dispatches[0].recipients[0].as_str(), "ops@example.com");

        let running = LifecycleEvent::task_state_change().with_detail("lastStatus", "RUNNING");
        assert!(router.route(&running).is_empty());
    }

    #[test]
    fn test_blueprint_round_trips_through_json() {
        let blueprint = StackBlueprint::default();
        let json = serde_json::to_string(&blueprint).unwrap();
        let back: StackBlueprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blueprint);
    }

    #[test]
    fn test_stack_name_must_be_one_path_component() {
        for name in ["", "  ", "../escape", "nested/stack", "win\\stack", ".."] {
            let mut blueprint = StackBlueprint::default();
            blueprint.stack_name = name.to_string();
            let err = StackBuilder::new(blueprint).build(&default_config()).unwrap_err();
            assert!(
                matches!(&err, StackError::Validation { field, .. } if field == "stack.name"),
                "{name:?}: {err}"
            );
        }
    }

    #[test]
    fn test_cluster_may_share_network_name() {
        let mut blueprint = StackBlueprint::default();
        blueprint.cluster_name = blueprint.network.name.clone();
        let graph = StackBuilder::new(blueprint).build(&default_config()).unwrap();
        assert_eq!(graph.count_of("Network"), 1);
        assert_eq!(graph.count_of("Cluster"), 1);
    }
}
