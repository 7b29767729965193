//! Notification rules derived from lifecycle transitions.

use crate::channel::Channel;
use crate::event::{JOB_EVENT_SOURCE, TASK_STATE_CHANGE};
use crate::matcher::{DetailMatch, EventPattern};
use indexmap::IndexSet;
use schedstack_core::{ResourceId, StackError, StackId, StackResult};
use serde::{Deserialize, Serialize};

/// Reason reported when the essential container of a task exits
pub const ESSENTIAL_CONTAINER_EXITED: &str = "Essential container in task exited";

/// A job lifecycle transition worth notifying about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleTransition {
    /// The task has started
    Started,
    /// The task stopped because its essential container exited
    StoppedEssentialExit,
    /// A named transition with its own detail predicate
    Custom {
        /// Rule name
        name: String,
        /// Detail predicate
        detail: DetailMatch,
    },
}

impl LifecycleTransition {
    /// Name of the rule watching this transition
    #[must_use]
    pub fn rule_name(&self) -> &str {
        match self {
            Self::Started => "TaskStartedRule",
            Self::StoppedEssentialExit => "TaskStoppedRule",
            Self::Custom { name, .. } => name,
        }
    }

    /// Detail predicate expressing this transition
    #[must_use]
    pub fn detail_match(&self) -> DetailMatch {
        match self {
            Self::Started => DetailMatch::new().with_field("lastStatus", ["STARTED"]),
            Self::StoppedEssentialExit => DetailMatch::new()
                .with_field("lastStatus", ["STOPPED"])
                .with_field("stoppedReason", [ESSENTIAL_CONTAINER_EXITED]),
            Self::Custom { detail, .. } => detail.clone(),
        }
    }
}

/// A rule routing matching events to a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRule {
    /// Resource id
    pub id: ResourceId,
    /// Rule name
    pub name: String,
    /// Event pattern
    pub pattern: EventPattern,
    /// Channel receiving matched events
    pub target_channel: ResourceId,
}

impl NotificationRule {
    /// Source the rule is pinned to
    #[must_use]
    pub fn event_source(&self) -> &str {
        &self.pattern.source
    }

    /// Detail type the rule is pinned to
    #[must_use]
    pub fn detail_type(&self) -> &str {
        &self.pattern.detail_type
    }

    /// Detail predicate of the rule
    #[must_use]
    pub fn detail_match(&self) -> &DetailMatch {
        &self.pattern.detail
    }
}

/// Derives one notification rule per watched transition
#[derive(Debug, Clone)]
pub struct NotificationRuleEngine {
    stack: StackId,
}

impl NotificationRuleEngine {
    /// Create an engine for a stack
    #[must_use]
    pub fn new(stack: StackId) -> Self {
        Self { stack }
    }

    /// Derive rules targeting `channel`
    ///
    /// Repeated transitions collapse into one rule.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a custom transition with an empty name,
    /// no constrained field, or a field with no accepted value, and for two
    /// transitions sharing a rule name
    pub fn derive(
        &self,
        channel: &Channel,
        transitions: &[LifecycleTransition],
    ) -> StackResult<Vec<NotificationRule>> {
        let mut unique: Vec<&LifecycleTransition> = Vec::with_capacity(transitions.len());
        for transition in transitions {
            if !unique.contains(&transition) {
                unique.push(transition);
            }
        }
        let mut names = IndexSet::new();
        let mut rules = Vec::with_capacity(unique.len());

        for transition in unique {
            validate_transition(transition)?;
            let name = transition.rule_name();
            if !names.insert(name) {
                return Err(StackError::validation(
                    "rule.name",
                    format!("'{name}' is used by more than one transition"),
                ));
            }

            let rule = NotificationRule {
                id: ResourceId::derive(&self.stack, "NotificationRule", name),
                name: name.to_string(),
                pattern: EventPattern::new(JOB_EVENT_SOURCE, TASK_STATE_CHANGE)
                    .with_detail(transition.detail_match()),
                target_channel: channel.id,
            };
            tracing::debug!(rule = %rule.name, channel = %channel.name, "derived notification rule");
            rules.push(rule);
        }

        Ok(rules)
    }
}

fn validate_transition(transition: &LifecycleTransition) -> StackResult<()> {
    let LifecycleTransition::Custom { name, detail } = transition else {
        return Ok(());
    };
    if name.trim().is_empty() {
        return Err(StackError::validation("rule.name", "must not be empty"));
    }
    if detail.is_empty() {
        return Err(StackError::validation(
            "rule.detail",
            format!("'{name}' must constrain at least one field"),
        ));
    }
    if let Some((field, _)) = detail.iter().find(|(_, values)| values.is_empty()) {
        return Err(StackError::validation(
            "rule.detail",
            format!("'{name}' accepts no value for field '{field}'"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LifecycleEvent;

    fn channel() -> Channel {
        Channel::new(&StackId::new("s"), "TaskStateAlert", &["ops@example.com"]).unwrap()
    }

    fn engine() -> NotificationRuleEngine {
        NotificationRuleEngine::new(StackId::new("s"))
    }

    #[test]
    fn test_one_rule_per_transition() {
        let rules = engine()
            .derive(
                &channel(),
                &[
                    LifecycleTransition::StoppedEssentialExit,
                    LifecycleTransition::Started,
                    LifecycleTransition::Started,
                ],
            )
            .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "TaskStoppedRule");
        assert_eq!(rules[1].name, "TaskStartedRule");
        for rule in &rules {
            assert_eq!(rule.event_source(), "aws.ecs");
            assert_eq!(rule.detail_type(), "ECS Task State Change");
            assert_eq!(rule.target_channel, channel().id);
        }
    }

    #[test]
    fn test_stopped_rule_matching() {
        let rules = engine()
            .derive(&channel(), &[LifecycleTransition::StoppedEssentialExit])
            .unwrap();
        let stopped = LifecycleEvent::task_state_change()
            .with_detail("lastStatus", "STOPPED")
            .with_detail("stoppedReason", "Essential container in task exited");
        let running = LifecycleEvent::task_state_change()
            .with_detail("lastStatus", "RUNNING")
            .with_detail("stoppedReason", "Essential container in task exited");

        assert!(rules[0].pattern.matches(&stopped).is_matched());
        assert!(!rules[0].pattern.matches(&running).is_matched());
    }

    #[test]
    fn test_custom_transition() {
        let custom = LifecycleTransition::Custom {
            name: "TaskPendingRule".to_string(),
            detail: DetailMatch::new().with_field("lastStatus", ["PENDING", "PROVISIONING"]),
        };
        let rules = engine().derive(&channel(), &[custom]).unwrap();
        assert_eq!(rules[0].name, "TaskPendingRule");
        assert_eq!(rules[0].detail_match().accepted("lastStatus").unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_custom_transitions() {
        let empty = LifecycleTransition::Custom {
            name: "Empty".to_string(),
            detail: DetailMatch::new(),
        };
        let no_values = LifecycleTransition::Custom {
            name: "NoValues".to_string(),
            detail: DetailMatch::new().with_field("lastStatus", Vec::<String>::new()),
        };
        let clash = LifecycleTransition::Custom {
            name: "TaskStartedRule".to_string(),
            detail: DetailMatch::new().with_field("lastStatus", ["RUNNING"]),
        };

        assert!(engine().derive(&channel(), &[empty]).is_err());
        assert!(engine().derive(&channel(), &[no_values]).is_err());
        assert!(engine()
            .derive(&channel(), &[LifecycleTransition::Started, clash])
            .is_err());
    }

    #[test]
    fn test_rule_ids_are_stable() {
        let a = engine().derive(&channel(), &[LifecycleTransition::Started]).unwrap();
        let b = engine().derive(&channel(), &[LifecycleTransition::Started]).unwrap();
        assert_eq!(a, b);
    }
}
