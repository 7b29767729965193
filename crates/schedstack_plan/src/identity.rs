//! Execution identities and their capability grants.
//!
//! Pure metadata: nothing here talks to a credential system.

use schedstack_core::{CapabilitySet, ResourceId, StackError, StackId, StackResult};
use serde::{Deserialize, Serialize};

/// Principal allowed to assume task identities
pub const TASK_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Role an identity plays for the task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityRole {
    /// Used by the agent to pull images and ship logs
    Execution,
    /// Assumed by the running container
    Task,
}

impl IdentityRole {
    fn name_for(self, prefix: &str) -> String {
        match self {
            Self::Execution => format!("{prefix}EcsAgentTaskExecutionRole"),
            Self::Task => format!("{prefix}-ECSContainerTaskRole"),
        }
    }
}

/// An assumable identity with granted capabilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Resource id
    pub id: ResourceId,
    /// Role
    pub role: IdentityRole,
    /// Identity name
    pub name: String,
    /// Principal trusted to assume it
    pub trusted_principal: String,
    /// Granted capabilities
    pub capabilities: CapabilitySet,
}

/// The execution and task identities of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPair {
    /// Execution identity
    pub execution: Identity,
    /// Task identity
    pub task: Identity,
}

/// Derives the two identities of a job
#[derive(Debug, Clone)]
pub struct IdentityProvisioner {
    service_name: String,
    trusted_principal: String,
}

impl IdentityProvisioner {
    /// Create a provisioner naming identities after `service_name`
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            trusted_principal: TASK_PRINCIPAL.to_string(),
        }
    }

    /// Override the trusted principal
    #[must_use]
    pub fn with_trusted_principal(mut self, principal: impl Into<String>) -> Self {
        self.trusted_principal = principal.into();
        self
    }

    /// Derive both identities
    ///
    /// # Errors
    ///
    /// Returns `UnknownCapability` if a reference is not in the catalog, or a
    /// validation error if the service name or principal is empty
    pub fn provision<S: AsRef<str>>(
        &self,
        stack: &StackId,
        execution_capabilities: &[S],
        task_capabilities: &[S],
    ) -> StackResult<IdentityPair> {
        if self.service_name.trim().is_empty() {
            return Err(StackError::validation("identity.service_name", "must not be empty"));
        }
        if self.trusted_principal.trim().is_empty() {
            return Err(StackError::validation("identity.trusted_principal", "must not be empty"));
        }

        Ok(IdentityPair {
            execution: self.identity(stack, IdentityRole::Execution, execution_capabilities)?,
            task: self.identity(stack, IdentityRole::Task, task_capabilities)?,
        })
    }

    fn identity<S: AsRef<str>>(
        &self,
        stack: &StackId,
        role: IdentityRole,
        references: &[S],
    ) -> StackResult<Identity> {
        let capabilities = CapabilitySet::resolve_all(references)?;
        let name = role.name_for(&self.service_name);
        tracing::debug!(identity = %name, grants = capabilities.len(), "derived identity");
        Ok(Identity {
            id: ResourceId::derive(stack, "Identity", &name),
            role,
            name,
            trusted_principal: self.trusted_principal.clone(),
            capabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schedstack_core::Capability;

    const EXECUTION: [&str; 4] = [
        "CloudWatchFullAccess",
        "CloudWatchLogsFullAccess",
        "AmazonEC2ContainerRegistryReadOnly",
        "service-role/AmazonECSTaskExecutionRolePolicy",
    ];
    const TASK: [&str; 4] = [
        "CloudWatchFullAccess",
        "AWSXRayDaemonWriteAccess",
        "service-role/AmazonECSTaskExecutionRolePolicy",
        "AmazonEC2ContainerRegistryPowerUser",
    ];

    #[test]
    fn test_names_derived_from_service() {
        let pair = IdentityProvisioner::new("ScheduledServiceTasks")
            .provision(&StackId::new("s"), &EXECUTION, &TASK)
            .unwrap();
        assert_eq!(pair.execution.name, "ScheduledServiceTasksEcsAgentTaskExecutionRole");
        assert_eq!(pair.task.name, "ScheduledServiceTasks-ECSContainerTaskRole");
        assert_eq!(pair.execution.role, IdentityRole::Execution);
        assert_eq!(pair.task.trusted_principal, TASK_PRINCIPAL);
        assert_ne!(pair.execution.id, pair.task.id);
    }

    #[test]
    fn test_capabilities_resolved() {
        let pair = IdentityProvisioner::new("svc")
            .provision(&StackId::new("s"), &EXECUTION, &TASK)
            .unwrap();
        assert!(pair.execution.capabilities.has(Capability::RegistryReadOnly));
        assert!(pair.task.capabilities.has(Capability::TraceDaemonWrite));
        assert!(!pair.execution.capabilities.has(Capability::RegistryPowerUser));
    }

    #[test]
    fn test_identity_serializes_policy_references() {
        let pair = IdentityProvisioner::new("svc")
            .provision(
                &StackId::new("s"),
                &["service-role/AmazonECSTaskExecutionRolePolicy"],
                &["AWSXRayDaemonWriteAccess"],
            )
            .unwrap();
        let execution = serde_json::to_value(&pair.execution).unwrap();
        assert_eq!(
            execution["capabilities"]["capabilities"],
            serde_json::json!(["service-role/AmazonECSTaskExecutionRolePolicy"])
        );
        let task = serde_json::to_value(&pair.task).unwrap();
        assert_eq!(
            task["capabilities"]["capabilities"],
            serde_json::json!(["AWSXRayDaemonWriteAccess"])
        );
        let back: Identity = serde_json::from_value(task).unwrap();
        assert_eq!(back, pair.task);
    }

    #[test]
    fn test_unknown_capability() {
        let result = IdentityProvisioner::new("svc").provision(
            &StackId::new("s"),
            &["CloudWatchFullAccess"],
            &["AmazonS3FullAccess"],
        );
        assert_eq!(
            result.unwrap_err(),
            StackError::UnknownCapability {
                reference: "AmazonS3FullAccess".to_string()
            }
        );
    }

    #[test]
    fn test_empty_service_name() {
        let empty: [&str; 0] = [];
        let result = IdentityProvisioner::new("").provision(&StackId::new("s"), &empty, &empty);
        assert!(matches!(result, Err(StackError::Validation { .. })));
    }

    #[test]
    fn test_provision_is_deterministic() {
        let provisioner = IdentityProvisioner::new("svc").with_trusted_principal("batch.example");
        let a = provisioner.provision(&StackId::new("s"), &EXECUTION, &TASK).unwrap();
        let b = provisioner.provision(&StackId::new("s"), &EXECUTION, &TASK).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.task.trusted_principal, "batch.example");
    }
}
