//! Tag pair applied to every resource in a stack.

use crate::config::Config;
use serde::{Deserialize, Serialize};

/// The `{environment, costcenter}` tag pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tags {
    /// Deployment environment, e.g. `dev`
    pub environment: String,
    /// Cost center billed for the stack
    #[serde(rename = "costcenter")]
    pub cost_center: String,
}

impl Tags {
    /// Tag key for the environment
    pub const ENVIRONMENT_KEY: &'static str = "environment";
    /// Tag key for the cost center
    pub const COST_CENTER_KEY: &'static str = "costcenter";

    /// Create a tag pair
    #[must_use]
    pub fn new(environment: impl Into<String>, cost_center: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            cost_center: cost_center.into(),
        }
    }

    /// Tags as key/value pairs, in a fixed order
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, &str); 2] {
        [
            (Self::ENVIRONMENT_KEY, self.environment.as_str()),
            (Self::COST_CENTER_KEY, self.cost_center.as_str()),
        ]
    }
}

impl From<&Config> for Tags {
    fn from(config: &Config) -> Self {
        Self::new(config.environment.clone(), config.cost_center.clone())
    }
}
