//! Task template: the job's container definitions and identities.
//!
//! Every container gets a `StackId` environment variable carrying the
//! deployment identifier, so the job payload can tell which stack launched it.

use crate::identity::{Identity, IdentityRole};
use indexmap::IndexMap;
use schedstack_core::{ResourceId, StackError, StackId, StackResult};
use serde::{Deserialize, Serialize};

/// Environment variable holding the deployment identifier
pub const STACK_ID_ENV: &str = "StackId";

/// Existing log group the container ships its output to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSink {
    /// Log group name
    pub group_name: String,
    /// Stream name prefix
    pub stream_prefix: String,
}

impl LogSink {
    /// Log sink with an explicit stream prefix
    #[must_use]
    pub fn new(group_name: impl Into<String>, stream_prefix: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            stream_prefix: stream_prefix.into(),
        }
    }

    /// Log sink whose streams are prefixed with the stack id
    #[must_use]
    pub fn for_stack(group_name: impl Into<String>, stack: &StackId) -> Self {
        Self::new(group_name, stack.as_str())
    }
}

/// Container as requested by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    /// Container name
    pub name: String,
    /// Image reference, e.g. `amazonlinux:2`
    pub image: String,
    /// Entry command
    pub command: Vec<String>,
    /// Environment in declaration order; keys must be unique
    pub environment: Vec<(String, String)>,
    /// Log sink
    pub log_sink: LogSink,
}

impl ContainerDefinition {
    /// Start a definition with no command or environment
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>, log_sink: LogSink) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command: Vec::new(),
            environment: Vec::new(),
            log_sink,
        }
    }

    /// Set the command
    #[must_use]
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Append an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.push((key.into(), value.into()));
        self
    }
}

/// Validated container of a task template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Entry command
    pub command: Vec<String>,
    /// Environment, including `StackId`
    pub environment: IndexMap<String, String>,
    /// Log sink
    pub log_sink: LogSink,
}

/// Task template bound to its two identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Resource id
    pub id: ResourceId,
    /// Family name
    pub family: String,
    /// Identity used by the agent
    pub execution_identity: ResourceId,
    /// Identity assumed by the containers
    pub task_identity: ResourceId,
    /// Containers, at least one
    pub containers: Vec<ContainerSpec>,
}

/// Builder for [`TaskTemplate`]
#[derive(Debug, Clone)]
pub struct TaskTemplateBuilder {
    family: String,
    containers: Vec<ContainerDefinition>,
}

impl TaskTemplateBuilder {
    /// Start a template for `family`
    #[must_use]
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            containers: Vec::new(),
        }
    }

    /// Add a container
    #[must_use]
    pub fn with_container(mut self, container: ContainerDefinition) -> Self {
        self.containers.push(container);
        self
    }

    /// Derive the template
    ///
    /// # Errors
    ///
    /// Returns a validation error if the family is empty, there is no
    /// container, a container has an empty image, name or command, an
    /// environment key repeats, or the identities have the wrong roles
    pub fn build(
        &self,
        stack: &StackId,
        execution: &Identity,
        task: &Identity,
    ) -> StackResult<TaskTemplate> {
        if self.family.trim().is_empty() {
            return Err(StackError::validation("task.family", "must not be empty"));
        }
        if execution.role != IdentityRole::Execution {
            return Err(StackError::validation(
                "task.execution_identity",
                format!("'{}' is not an execution identity", execution.name),
            ));
        }
        if task.role != IdentityRole::Task {
            return Err(StackError::validation(
                "task.task_identity",
                format!("'{}' is not a task identity", task.name),
            ));
        }
        if self.containers.is_empty() {
            return Err(StackError::validation(
                "task.containers",
                "at least one container is required",
            ));
        }

        let mut containers: Vec<ContainerSpec> = Vec::with_capacity(self.containers.len());
        for definition in &self.containers {
            if containers.iter().any(|c| c.name == definition.name) {
                return Err(StackError::validation(
                    "task.containers",
                    format!("container '{}' is declared twice", definition.name),
                ));
            }
            containers.push(container_spec(stack, definition)?);
        }

        tracing::debug!(family = %self.family, containers = containers.len(), "derived task template");
        Ok(TaskTemplate {
            id: ResourceId::derive(stack, "TaskTemplate", &self.family),
            family: self.family.clone(),
            execution_identity: execution.id,
            task_identity: task.id,
            containers,
        })
    }
}

fn container_spec(stack: &StackId, definition: &ContainerDefinition) -> StackResult<ContainerSpec> {
    let field = |name: &str| format!("container.{}.{name}", definition.name);

    if definition.name.trim().is_empty() {
        return Err(StackError::validation("container.name", "must not be empty"));
    }
    if definition.image.trim().is_empty() {
        return Err(StackError::validation(field("image"), "must not be empty"));
    }
    if definition.command.is_empty() {
        return Err(StackError::validation(field("command"), "must not be empty"));
    }
    if definition.log_sink.group_name.trim().is_empty() {
        return Err(StackError::validation(field("log_sink"), "log group name must not be empty"));
    }

    let mut environment = IndexMap::with_capacity(definition.environment.len() + 1);
    for (key, value) in &definition.environment {
        if key == STACK_ID_ENV {
            return Err(StackError::validation(
                field("environment"),
                format!("'{STACK_ID_ENV}' is set from the deployment identifier"),
            ));
        }
        if environment.insert(key.clone(), value.clone()).is_some() {
            return Err(StackError::validation(
                field("environment"),
                format!("key '{key}' is given more than once"),
            ));
        }
    }
    environment.insert(STACK_ID_ENV.to_string(), stack.to_string());

    Ok(ContainerSpec {
        name: definition.name.clone(),
        image: definition.image.clone(),
        command: definition.command.clone(),
        environment,
        log_sink: definition.log_sink.clone(),
    })
}
