//! Core error types for SCHEDSTACK.
//!
//! Every error here is detected locally at build time and is fatal: nothing
//! is handed to the provisioning engine once one of these has been raised.

/// Core result type
pub type StackResult<T> = Result<T, StackError>;

/// Build-time error raised while deriving the resource graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    /// A required configuration field is absent or empty
    #[error("Configuration field '{field}' is missing or empty")]
    ConfigMissingField {
        /// Name of the missing field
        field: String,
    },

    /// The configuration payload could not be parsed
    #[error("Configuration parse error: {message}")]
    ConfigParseError {
        /// Parser message
        message: String,
    },

    /// The requested subnets do not fit in the address block
    #[error("Invalid address plan: {reason}")]
    InvalidAddressPlan {
        /// Why the plan was rejected
        reason: String,
    },

    /// A capability reference is not in the catalog
    #[error("Unknown capability: {reference}")]
    UnknownCapability {
        /// The unresolved reference
        reference: String,
    },

    /// A cron field is outside the accepted grammar
    #[error("Invalid schedule field {field}='{value}': {reason}")]
    InvalidSchedule {
        /// Cron field name
        field: String,
        /// Offending value
        value: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A resource depends on an id that is not in the graph
    #[error("Incomplete graph: {resource} depends on missing {missing}")]
    IncompleteGraph {
        /// Logical name of the dependent resource
        resource: String,
        /// The missing resource id
        missing: String,
    },

    /// The same resource id was added twice
    #[error("Resource already exists: {id}")]
    DuplicateResource {
        /// Duplicate resource id
        id: String,
    },

    /// Declared dependencies form a cycle
    #[error("Dependency cycle detected involving {resources:?}")]
    CycleDetected {
        /// Logical names of resources on the cycle
        resources: Vec<String>,
    },

    /// Generic validation failure
    #[error("Validation failed for {field}: {reason}")]
    Validation {
        /// Offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },
}

impl StackError {
    /// Shorthand for a validation failure
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an address plan failure
    pub fn address_plan(reason: impl Into<String>) -> Self {
        Self::InvalidAddressPlan {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigParseError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StackError::ConfigMissingField {
            field: "email".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Configuration field 'email' is missing or empty"
        );

        let err = StackError::IncompleteGraph {
            resource: "TaskDefinition".to_string(),
            missing: "res_123".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Incomplete graph: TaskDefinition depends on missing res_123"
        );
    }

    #[test]
    fn test_schedule_error_mentions_value() {
        let err = StackError::InvalidSchedule {
            field: "minute".to_string(),
            value: "60".to_string(),
            reason: "out of range 0-59".to_string(),
        };
        let s = format!("{}", err);
        assert!(s.contains("minute"));
        assert!(s.contains("60"));
    }

    #[test]
    fn test_json_error_becomes_parse_error() {
        let err: StackError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, StackError::ConfigParseError { .. }));
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            StackError::validation("name", "empty"),
            StackError::Validation {
                field: "name".to_string(),
                reason: "empty".to_string(),
            }
        );
        assert_ne!(
            StackError::validation("name", "empty"),
            StackError::address_plan("empty")
        );
    }
}
