//! Target account and region, passed through to the engine untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a graph is deployed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeployContext {
    /// Target account, if known
    pub account: Option<String>,
    /// Target region, if known
    pub region: Option<String>,
}

impl DeployContext {
    /// Context with neither account nor region
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the account; blank values count as unset
    #[must_use]
    pub fn with_account(mut self, account: Option<String>) -> Self {
        self.account = account.filter(|a| !a.trim().is_empty());
        self
    }

    /// Set the region; blank values count as unset
    #[must_use]
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region.filter(|r| !r.trim().is_empty());
        self
    }
}

impl fmt::Display for DeployContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.account.as_deref().unwrap_or("default-account"),
            self.region.as_deref().unwrap_or("default-region")
        )
    }
}
