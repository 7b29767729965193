//! Notification channels and their subscribers.

use schedstack_core::{ResourceId, StackError, StackId, StackResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A syntactically valid email address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse an address of the form `local@domain.tld`
    ///
    /// # Errors
    ///
    /// Returns a validation error if the address is malformed
    pub fn parse(address: &str) -> StackResult<Self> {
        let address = address.trim();
        let invalid = |reason: &str| StackError::validation("email", format!("'{address}' {reason}"));

        let (local, domain) = address
            .split_once('@')
            .ok_or_else(|| invalid("has no '@'"))?;
        if local.is_empty() || domain.is_empty() {
            return Err(invalid("has an empty local part or domain"));
        }
        if domain.contains('@') {
            return Err(invalid("has more than one '@'"));
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(invalid("has no valid domain"));
        }
        if address.chars().any(char::is_whitespace) {
            return Err(invalid("contains whitespace"));
        }
        Ok(Self(address.to_string()))
    }

    /// Get as str
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = StackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(address: EmailAddress) -> Self {
        address.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A publish/subscribe channel with email subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChannel")]
pub struct Channel {
    /// Resource id
    pub id: ResourceId,
    /// Channel (topic) name
    pub name: String,
    /// Subscribed addresses
    pub subscribers: BTreeSet<EmailAddress>,
}

impl Channel {
    /// Create a channel with at least one subscriber
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is empty, there are no
    /// subscribers, or an address is malformed
    pub fn new<S: AsRef<str>>(stack: &StackId, name: &str, subscribers: &[S]) -> StackResult<Self> {
        let subscribers = subscribers
            .iter()
            .map(|s| EmailAddress::parse(s.as_ref()))
            .collect::<StackResult<BTreeSet<_>>>()?;
        Self::checked(ResourceId::derive(stack, "Channel", name), name.to_string(), subscribers)
    }

    fn checked(id: ResourceId, name: String, subscribers: BTreeSet<EmailAddress>) -> StackResult<Self> {
        if name.trim().is_empty() {
            return Err(StackError::validation("channel.name", "must not be empty"));
        }
        if subscribers.is_empty() {
            return Err(StackError::validation(
                "channel.subscribers",
                "at least one subscriber is required",
            ));
        }
        Ok(Self { id, name, subscribers })
    }
}

#[derive(Deserialize)]
struct RawChannel {
    id: ResourceId,
    name: String,
    subscribers: BTreeSet<EmailAddress>,
}

impl TryFrom<RawChannel> for Channel {
    type Error = StackError;

    fn try_from(raw: RawChannel) -> Result<Self, Self::Error> {
        Self::checked(raw.id, raw.name, raw.subscribers)
    }
}
