//! Stack configuration and its validator.
//!
//! The payload is a JSON object whose field names are matched
//! case-insensitively against a fixed field list. The lookup happens once
//! here; everything downstream works on the typed [`Config`].

use crate::error::{StackError, StackResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Validated stack configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Address subscribed to job lifecycle notifications
    pub email: String,
    /// Deployment environment tag value (may be empty)
    pub environment: String,
    /// Cost center tag value (may be empty)
    pub cost_center: String,
    /// Whether lifecycle notification rules are derived
    pub notifications: bool,
}

impl Config {
    /// Optional fields the payload left empty, for the caller to warn about
    #[must_use]
    pub fn missing_optional_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.environment.is_empty() {
            missing.push(Field::Environment.name());
        }
        if self.cost_center.is_empty() {
            missing.push(Field::CostCenter.name());
        }
        missing
    }
}

/// Declared configuration fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Email,
    Environment,
    CostCenter,
    Notifications,
}

impl Field {
    const ALL: [Field; 4] = [
        Self::Email,
        Self::Environment,
        Self::CostCenter,
        Self::Notifications,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Environment => "environment",
            Self::CostCenter => "costCenter",
            Self::Notifications => "notifications",
        }
    }

    fn lookup(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(key))
    }
}

/// Parses and validates configuration payloads
#[derive(Debug, Clone, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse and validate a JSON payload
    ///
    /// # Errors
    ///
    /// Returns `ConfigParseError` if the payload is malformed and
    /// `ConfigMissingField` if the email is absent or empty
    pub fn parse(&self, payload: &str) -> StackResult<Config> {
        let value: Value = serde_json::from_str(payload)?;
        self.validate(&value)
    }

    /// Validate an already decoded payload
    ///
    /// # Errors
    ///
    /// Same as [`ConfigValidator::parse`]
    pub fn validate(&self, value: &Value) -> StackResult<Config> {
        let object = value.as_object().ok_or_else(|| StackError::ConfigParseError {
            message: "configuration must be a JSON object".to_string(),
        })?;
        let fields = normalize(object)?;

        let email = string_field(&fields, Field::Email)?.unwrap_or_default();
        if email.trim().is_empty() {
            return Err(StackError::ConfigMissingField {
                field: Field::Email.name().to_string(),
            });
        }

        let notifications = match fields.get(Field::Notifications) {
            None | Some(Value::Null) => true,
            Some(Value::Bool(enabled)) => *enabled,
            Some(other) => {
                return Err(type_error(Field::Notifications, "a boolean", other));
            }
        };

        Ok(Config {
            email: email.trim().to_string(),
            environment: string_field(&fields, Field::Environment)?.unwrap_or_default(),
            cost_center: string_field(&fields, Field::CostCenter)?.unwrap_or_default(),
            notifications,
        })
    }
}

/// Payload values keyed by declared field
struct Fields<'a> {
    values: [Option<&'a Value>; 4],
}

impl<'a> Fields<'a> {
    fn slot(field: Field) -> usize {
        match field {
            Field::Email => 0,
            Field::Environment => 1,
            Field::CostCenter => 2,
            Field::Notifications => 3,
        }
    }

    fn get(&self, field: Field) -> Option<&'a Value> {
        self.values[Self::slot(field)]
    }
}

fn normalize(object: &Map<String, Value>) -> StackResult<Fields<'_>> {
    let mut fields = Fields { values: [None; 4] };
    for (key, value) in object {
        let Some(field) = Field::lookup(key) else {
            tracing::debug!(key = %key, "ignoring unknown configuration field");
            continue;
        };
        let slot = &mut fields.values[Fields::slot(field)];
        if slot.is_some() {
            return Err(StackError::ConfigParseError {
                message: format!("field '{}' is given more than once", field.name()),
            });
        }
        *slot = Some(value);
    }
    Ok(fields)
}

fn string_field(fields: &Fields<'_>, field: Field) -> StackResult<Option<String>> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(type_error(field, "a string", other)),
    }
}

fn type_error(field: Field, expected: &str, actual: &Value) -> StackError {
    StackError::ConfigParseError {
        message: format!("field '{}' must be {}, got {}", field.name(), expected, actual),
    }
}
