//! Job configuration record definitions.

use serde::{Deserialize, Serialize};

use crate::DecodeError;

/// How a job re-enters the ready queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudJobExecutionType {
    /// Runs once and is never queued again.
    OneOff,
    /// Runs once per trigger fire.
    Transient,
    /// Re-enters the ready queue after every run.
    Daemon,
}

impl CloudJobExecutionType {
    /// Returns true for jobs that requeue themselves between runs.
    pub fn is_daemon(&self) -> bool {
        matches!(self, Self::Daemon)
    }
}

impl std::fmt::Display for CloudJobExecutionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CloudJobExecutionType::OneOff => "ONE_OFF",
            CloudJobExecutionType::Transient => "TRANSIENT",
            CloudJobExecutionType::Daemon => "DAEMON",
        };
        write!(f, "{}", s)
    }
}

/// Persisted description of a schedulable cloud job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudJobConfiguration {
    /// Unique job name; also the node name under the configuration root.
    pub job_name: String,

    /// Execution type.
    pub job_execution_type: CloudJobExecutionType,

    /// Whether missed trigger fires are re-dispatched.
    #[serde(default = "default_misfire", alias = "misfireEnabled")]
    pub misfire: bool,

    /// Application the job belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    /// Trigger expression. Required for transient jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,

    #[serde(default = "default_sharding_total_count")]
    pub sharding_total_count: u32,

    #[serde(default = "default_cpu_count")]
    pub cpu_count: f64,

    #[serde(default = "default_memory_mb", rename = "memoryMB")]
    pub memory_mb: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_parameter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_misfire() -> bool {
    true
}

fn default_sharding_total_count() -> u32 {
    1
}

fn default_cpu_count() -> f64 {
    1.0
}

fn default_memory_mb() -> f64 {
    128.0
}

impl CloudJobConfiguration {
    /// Create a configuration with default resources and misfire enabled.
    pub fn new(job_name: impl Into<String>, job_execution_type: CloudJobExecutionType) -> Self {
        Self {
            job_name: job_name.into(),
            job_execution_type,
            misfire: default_misfire(),
            app_name: None,
            cron: None,
            sharding_total_count: default_sharding_total_count(),
            cpu_count: default_cpu_count(),
            memory_mb: default_memory_mb(),
            job_parameter: None,
            description: None,
        }
    }

    /// Set the trigger expression.
    pub fn with_cron(mut self, cron: impl Into<String>) -> Self {
        self.cron = Some(cron.into());
        self
    }

    /// Set the misfire flag.
    pub fn with_misfire(mut self, misfire: bool) -> Self {
        self.misfire = misfire;
        self
    }

    /// Check the field constraints a stored record must satisfy.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.job_name.trim().is_empty() {
            return Err(DecodeError::invalid("jobName", "must not be empty"));
        }
        if self.job_name.contains('/') {
            return Err(DecodeError::invalid(
                "jobName",
                format!("'{}' must not contain '/'", self.job_name),
            ));
        }
        if self.sharding_total_count == 0 {
            return Err(DecodeError::invalid(
                "shardingTotalCount",
                "must be at least 1",
            ));
        }
        if !(self.cpu_count > 0.0) {
            return Err(DecodeError::invalid(
                "cpuCount",
                format!("{} is not positive", self.cpu_count),
            ));
        }
        if !(self.memory_mb > 0.0) {
            return Err(DecodeError::invalid(
                "memoryMB",
                format!("{} is not positive", self.memory_mb),
            ));
        }
        if self.job_execution_type == CloudJobExecutionType::Transient
            && self.cron.as_deref().map_or(true, |c| c.trim().is_empty())
        {
            return Err(DecodeError::invalid(
                "cron",
                "transient jobs require a trigger expression",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_type_wire_names() {
        let json = serde_json::to_string(&CloudJobExecutionType::OneOff).unwrap();
        assert_eq!(json, "\"ONE_OFF\"");
        let parsed: CloudJobExecutionType = serde_json::from_str("\"DAEMON\"").unwrap();
        assert_eq!(parsed, CloudJobExecutionType::Daemon);
        assert_eq!(CloudJobExecutionType::Transient.to_string(), "TRANSIENT");
    }

    #[test]
    fn test_only_daemon_is_daemon() {
        assert!(CloudJobExecutionType::Daemon.is_daemon());
        assert!(!CloudJobExecutionType::Transient.is_daemon());
        assert!(!CloudJobExecutionType::OneOff.is_daemon());
    }

    #[test]
    fn test_validate_rejects_slash_in_name() {
        let config = CloudJobConfiguration::new("a/b", CloudJobExecutionType::OneOff);
        assert!(matches!(
            config.validate(),
            Err(DecodeError::Invalid { field: "jobName", .. })
        ));
    }

    #[test]
    fn test_validate_requires_cron_for_transient() {
        let config = CloudJobConfiguration::new("job", CloudJobExecutionType::Transient);
        assert!(config.validate().is_err());
        assert!(config.with_cron("0 * * * * ?").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_shards() {
        let mut config = CloudJobConfiguration::new("job", CloudJobExecutionType::Daemon);
        config.sharding_total_count = 0;
        assert!(config.validate().is_err());
    }
}
