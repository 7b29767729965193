//! SCHEDSTACK Notifications
//!
//! Event-pattern rules over job lifecycle transitions, the channels they
//! publish to, and a router that evaluates inbound events against them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod event;
pub mod matcher;
pub mod router;
pub mod rule;

pub use channel::{Channel, EmailAddress};
pub use event::LifecycleEvent;
pub use matcher::{DetailMatch, EventPattern, MatchResult};
pub use router::{Dispatch, NotificationRouter};
pub use rule::{LifecycleTransition, NotificationRule, NotificationRuleEngine};
