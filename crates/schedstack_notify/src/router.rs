//! Routes lifecycle events to channel subscribers.
//!
//! Every rule is evaluated on its own. When several rules match the same
//! event, each produces its own dispatch; nothing is deduplicated.

use crate::channel::{Channel, EmailAddress};
use crate::event::LifecycleEvent;
use crate::rule::NotificationRule;
use indexmap::IndexMap;
use schedstack_core::{ResourceId, StackError, StackResult};
use serde::{Deserialize, Serialize};

/// One notification to send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    /// Rule that fired
    pub rule: String,
    /// Channel published to
    pub channel: String,
    /// Every subscriber of the channel
    pub recipients: Vec<EmailAddress>,
}

/// Evaluates events against a fixed rule set
#[derive(Debug, Clone)]
pub struct NotificationRouter {
    channels: IndexMap<ResourceId, Channel>,
    rules: Vec<NotificationRule>,
}

impl NotificationRouter {
    /// Create a router
    ///
    /// # Errors
    ///
    /// Returns `IncompleteGraph` if a rule targets a channel that is not given
    pub fn new(channels: Vec<Channel>, rules: Vec<NotificationRule>) -> StackResult<Self> {
        let channels: IndexMap<ResourceId, Channel> =
            channels.into_iter().map(|c| (c.id, c)).collect();
        if let Some(rule) = rules.iter().find(|r| !channels.contains_key(&r.target_channel)) {
            return Err(StackError::IncompleteGraph {
                resource: rule.name.clone(),
                missing: rule.target_channel.to_string(),
            });
        }
        Ok(Self { channels, rules })
    }

    /// Dispatches produced by an event, in rule order
    #[must_use]
    pub fn route(&self, event: &LifecycleEvent) -> Vec<Dispatch> {
        let mut dispatches = Vec::new();
        for rule in &self.rules {
            if !rule.pattern.matches(event).is_matched() {
                continue;
            }
            let Some(channel) = self.channels.get(&rule.target_channel) else {
                continue;
            };
            tracing::debug!(rule = %rule.name, channel = %channel.name, "rule fired");
            dispatches.push(Dispatch {
                rule: rule.name.clone(),
                channel: channel.name.clone(),
                recipients: channel.subscribers.iter().cloned().collect(),
            });
        }
        dispatches
    }

    /// Number of rules
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::DetailMatch;
    use crate::rule::{LifecycleTransition, NotificationRuleEngine};
    use schedstack_core::StackId;

    fn stack() -> StackId {
        StackId::new("s")
    }

    fn router(transitions: &[LifecycleTransition]) -> NotificationRouter {
        let channel = Channel::new(
            &stack(),
            "TaskStateAlert",
            &["ops@example.com", "oncall@example.com"],
        )
        .unwrap();
        let rules = NotificationRuleEngine::new(stack())
            .derive(&channel, transitions)
            .unwrap();
        NotificationRouter::new(vec![channel], rules).unwrap()
    }

    #[test]
    fn test_stopped_event_dispatches_to_all_subscribers() {
        let router = router(&[
            LifecycleTransition::StoppedEssentialExit,
            LifecycleTransition::Started,
        ]);
        let event = LifecycleEvent::task_state_change()
            .with_detail("lastStatus", "STOPPED")
            .with_detail("stoppedReason", "Essential container in task exited");

        let dispatches = router.route(&event);
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].rule, "TaskStoppedRule");
        assert_eq!(dispatches[0].recipients.len(), 2);
    }

    #[test]
    fn test_unmatched_event_dispatches_nothing() {
        let router = router(&[LifecycleTransition::StoppedEssentialExit]);
        let event = LifecycleEvent::task_state_change().with_detail("lastStatus", "RUNNING");
        assert!(router.route(&event).is_empty());
    }

    #[test]
    fn test_overlapping_rules_each_dispatch() {
        let any_stop = LifecycleTransition::Custom {
            name: "AnyStopRule".to_string(),
            detail: DetailMatch::new().with_field("lastStatus", ["STOPPED"]),
        };
        let router = router(&[LifecycleTransition::StoppedEssentialExit, any_stop]);
        let event = LifecycleEvent::task_state_change()
            .with_detail("lastStatus", "STOPPED")
            .with_detail("stoppedReason", "Essential container in task exited");

        let dispatches = router.route(&event);
        assert_eq!(dispatches.len(), 2);
        assert_eq!(dispatches[0].recipients, dispatches[1].recipients);
        assert_ne!(dispatches[0].rule, dispatches[1].rule);
    }

    #[test]
    fn test_rule_with_unknown_channel_rejected() {
        let channel = Channel::new(&stack(), "TaskStateAlert", &["ops@example.com"]).unwrap();
        let rules = NotificationRuleEngine::new(stack())
            .derive(&channel, &[LifecycleTransition::Started])
            .unwrap();
        let result = NotificationRouter::new(Vec::new(), rules);
        assert!(matches!(result, Err(StackError::IncompleteGraph { .. })));
    }
}
