//! Recurring schedule trigger.
//!
//! A trigger launches the task template on the cluster whenever the wall
//! clock (UTC) matches its cron fields. It gives no overlap guarantee: if the
//! previous launch is still running at the next firing, both run side by side
//! unless the provisioning engine is configured with a concurrency limit.

use crate::cluster::ComputeCluster;
use crate::task::TaskTemplate;
use chrono::{DateTime, Datelike, Timelike, Utc};
use schedstack_core::{ResourceId, StackError, StackId, StackResult};
use serde::{Deserialize, Serialize};

/// One cron field: a wildcard or a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum CronField {
    /// `*`
    Any,
    /// A numeric literal
    Value(u8),
}

impl CronField {
    fn parse(field: &str, raw: &str, min: u8, max: u8) -> StackResult<Self> {
        let invalid = |reason: String| StackError::InvalidSchedule {
            field: field.to_string(),
            value: raw.to_string(),
            reason,
        };

        let raw = raw.trim();
        if raw == "*" {
            return Ok(Self::Any);
        }
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected '*' or a number".to_string()));
        }
        let value: u32 = raw
            .parse()
            .map_err(|_| invalid(format!("out of range {min}-{max}")))?;
        if value < u32::from(min) || value > u32::from(max) {
            return Err(invalid(format!("out of range {min}-{max}")));
        }
        Ok(Self::Value(value as u8))
    }

    /// Check whether a clock component satisfies the field
    #[must_use]
    pub fn accepts(&self, component: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Value(v) => u32::from(*v) == component,
        }
    }
}

impl std::fmt::Display for CronField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

impl From<CronField> for String {
    fn from(field: CronField) -> Self {
        field.to_string()
    }
}

/// Minute, hour, day-of-month and month; day-of-week is implicitly `*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCronFields")]
pub struct CronFields {
    /// Minute, 0-59
    pub minute: CronField,
    /// Hour, 0-23
    pub hour: CronField,
    /// Day of month, 1-31
    pub day: CronField,
    /// Month, 1-12
    pub month: CronField,
}

impl CronFields {
    /// Validate four raw fields
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchedule` for the first field that is neither `*` nor
    /// a number within its range
    pub fn new(minute: &str, hour: &str, day: &str, month: &str) -> StackResult<Self> {
        Ok(Self {
            minute: CronField::parse("minute", minute, 0, 59)?,
            hour: CronField::parse("hour", hour, 0, 23)?,
            day: CronField::parse("day", day, 1, 31)?,
            month: CronField::parse("month", month, 1, 12)?,
        })
    }

    /// Parse a whitespace-separated `minute hour day month` string
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchedule` if there are not exactly four fields or one
    /// is invalid
    pub fn parse(expression: &str) -> StackResult<Self> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        let [minute, hour, day, month] = parts.as_slice() else {
            return Err(StackError::InvalidSchedule {
                field: "expression".to_string(),
                value: expression.to_string(),
                reason: format!("expected 4 fields, got {}", parts.len()),
            });
        };
        Self::new(minute, hour, day, month)
    }

    /// Render for the event scheduler: `cron(m h d mo ? *)`
    #[must_use]
    pub fn expression(&self) -> String {
        format!(
            "cron({} {} {} {} ? *)",
            self.minute, self.hour, self.day, self.month
        )
    }

    /// Check whether the schedule fires at the given UTC minute
    #[must_use]
    pub fn fires_at(&self, at: &DateTime<Utc>) -> bool {
        self.minute.accepts(at.minute())
            && self.hour.accepts(at.hour())
            && self.day.accepts(at.day())
            && self.month.accepts(at.month())
    }
}

/// Serialized form of [`CronFields`], checked per field range on the way in
#[derive(Deserialize)]
struct RawCronFields {
    minute: String,
    hour: String,
    day: String,
    month: String,
}

impl TryFrom<RawCronFields> for CronFields {
    type Error = StackError;

    fn try_from(raw: RawCronFields) -> Result<Self, Self::Error> {
        Self::new(&raw.minute, &raw.hour, &raw.day, &raw.month)
    }
}

/// Runtime platform the task launches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlatformVersion {
    /// Whatever the provider currently calls latest
    #[default]
    #[serde(rename = "LATEST")]
    Latest,
    /// Platform 1.4.0
    #[serde(rename = "1.4.0")]
    V1_4_0,
    /// Platform 1.3.0
    #[serde(rename = "1.3.0")]
    V1_3_0,
}

/// Recurring trigger binding a task template to a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTrigger {
    /// Resource id
    pub id: ResourceId,
    /// Trigger name
    pub name: String,
    /// Cron fields
    pub cron: CronFields,
    /// Rendered schedule expression
    pub expression: String,
    /// Cluster the task runs on
    pub target_cluster: ResourceId,
    /// Template launched on each firing
    pub target_template: ResourceId,
    /// Runtime platform
    pub platform_version: PlatformVersion,
}

/// Builder for [`ScheduleTrigger`]
#[derive(Debug, Clone)]
pub struct ScheduleTriggerBuilder {
    name: String,
    fields: [String; 4],
    platform_version: PlatformVersion,
}

impl ScheduleTriggerBuilder {
    /// Start a trigger firing every minute on the latest platform
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: ["*".to_string(), "*".to_string(), "*".to_string(), "*".to_string()],
            platform_version: PlatformVersion::Latest,
        }
    }

    /// Set the raw cron fields
    #[must_use]
    pub fn with_cron(
        mut self,
        minute: impl Into<String>,
        hour: impl Into<String>,
        day: impl Into<String>,
        month: impl Into<String>,
    ) -> Self {
        self.fields = [minute.into(), hour.into(), day.into(), month.into()];
        self
    }

    /// Set the platform version
    #[must_use]
    pub fn with_platform_version(mut self, version: PlatformVersion) -> Self {
        self.platform_version = version;
        self
    }

    /// Derive the trigger
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchedule` for an invalid cron field, or a validation
    /// error if the name is empty
    pub fn build(
        &self,
        stack: &StackId,
        cluster: &ComputeCluster,
        template: &TaskTemplate,
    ) -> StackResult<ScheduleTrigger> {
        if self.name.trim().is_empty() {
            return Err(StackError::validation("trigger.name", "must not be empty"));
        }
        let [minute, hour, day, month] = &self.fields;
        let cron = CronFields::new(minute, hour, day, month)?;
        let expression = cron.expression();
        tracing::debug!(trigger = %self.name, %expression, "derived schedule trigger");

        Ok(ScheduleTrigger {
            id: ResourceId::derive(stack, "ScheduleTrigger", &self.name),
            name: self.name.clone(),
            cron,
            expression,
            target_cluster: cluster.id,
            target_template: template.id,
            platform_version: self.platform_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_accepts_daily_schedule() {
        let cron = CronFields::new("00", "15", "*", "*").unwrap();
        assert_eq!(cron.minute, CronField::Value(0));
        assert_eq!(cron.hour, CronField::Value(15));
        assert_eq!(cron.day, CronField::Any);
        assert_eq!(cron.expression(), "cron(0 15 * * ? *)");
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = CronFields::new("60", "15", "*", "*").unwrap_err();
        assert!(matches!(
            err,
            StackError::InvalidSchedule { ref field, ref value, .. } if field == "minute" && value == "60"
        ));
        assert!(CronFields::new("0", "24", "*", "*").is_err());
        assert!(CronFields::new("0", "0", "0", "*").is_err());
        assert!(CronFields::new("0", "0", "32", "*").is_err());
        assert!(CronFields::new("0", "0", "*", "13").is_err());
        assert!(CronFields::new("0", "0", "*", "0").is_err());
    }

    #[test]
    fn test_rejects_non_literals() {
        for bad in ["*/5", "1-5", "1,2", "-1", "", "a", "99999999999"] {
            assert!(
                matches!(CronFields::new(bad, "0", "*", "*"), Err(StackError::InvalidSchedule { .. })),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn test_parse_expression() {
        assert_eq!(
            CronFields::parse("00 15 * *").unwrap(),
            CronFields::new("0", "15", "*", "*").unwrap()
        );
        assert!(CronFields::parse("0 15 * * MON").is_err());
        assert!(CronFields::parse("0 15").is_err());
    }

    #[test]
    fn test_fires_at() {
        let cron = CronFields::new("00", "15", "*", "*").unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 15, 0, 30).unwrap();
        assert!(cron.fires_at(&at));
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 15, 1, 0).unwrap();
        assert!(!cron.fires_at(&at));

        let yearly = CronFields::new("30", "6", "1", "1").unwrap();
        assert!(yearly.fires_at(&Utc.with_ymd_and_hms(2027, 1, 1, 6, 30, 0).unwrap()));
        assert!(!yearly.fires_at(&Utc.with_ymd_and_hms(2027, 2, 1, 6, 30, 0).unwrap()));
    }

    #[test]
    fn test_platform_version_serialization() {
        assert_eq!(serde_json::to_string(&PlatformVersion::Latest).unwrap(), "\"LATEST\"");
        assert_eq!(serde_json::to_string(&PlatformVersion::V1_4_0).unwrap(), "\"1.4.0\"");
    }

    #[test]
    fn test_cron_fields_serialize_as_strings() {
        let cron = CronFields::new("0", "15", "*", "*").unwrap();
        let json = serde_json::to_value(cron).unwrap();
        assert_eq!(json, serde_json::json!({"minute": "0", "hour": "15", "day": "*", "month": "*"}));
    }

    #[test]
    fn test_cron_fields_deserialize_checks_each_range() {
        let cron: CronFields = serde_json::from_value(
            serde_json::json!({"minute": "0", "hour": "15", "day": "*", "month": "*"}),
        )
        .unwrap();
        assert_eq!(cron, CronFields::new("0", "15", "*", "*").unwrap());

        for json in [
            serde_json::json!({"minute": "0", "hour": "45", "day": "*", "month": "*"}),
            serde_json::json!({"minute": "0", "hour": "15", "day": "0", "month": "*"}),
            serde_json::json!({"minute": "0", "hour": "15", "day": "*", "month": "0"}),
            serde_json::json!({"minute": "60", "hour": "15", "day": "*", "month": "*"}),
        ] {
            let err = serde_json::from_value::<CronFields>(json.clone()).unwrap_err();
            assert!(err.to_string().contains("out of range"), "{json}: {err}");
        }
    }
}
