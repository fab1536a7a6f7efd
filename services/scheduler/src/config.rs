use std::time::Duration;

use anyhow::Result;

/// Name the scheduler registers under with the resource manager.
pub const FRAMEWORK_NAME: &str = "Elastic-Job-Cloud";

/// How long the resource manager keeps the framework's tasks after the
/// scheduler disconnects.
pub const FRAMEWORK_FAILOVER_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 7);

pub const DEFAULT_JOB_CONFIG_ROOT: &str = "/config/job";
pub const DEFAULT_READY_ROOT: &str = "/state/ready";

/// Resource manager connection settings.
#[derive(Debug, Clone)]
pub struct MesosConfig {
    pub user: String,
    pub url: String,
    pub hostname: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub job_config_root: String,
    pub ready_root: String,
    /// Upper bound on queued ready entries; transient enqueues beyond it are dropped.
    pub ready_queue_size: usize,
    pub shutdown_timeout: Duration,
    pub mesos: MesosConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            job_config_root: DEFAULT_JOB_CONFIG_ROOT.to_string(),
            ready_root: DEFAULT_READY_ROOT.to_string(),
            ready_queue_size: 10_000,
            shutdown_timeout: Duration::from_secs(10),
            mesos: MesosConfig {
                user: String::new(),
                url: "zk://localhost:2181/mesos".to_string(),
                hostname: "localhost".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let log_level = std::env::var("CLOUDJOB_LOG_LEVEL").unwrap_or(defaults.log_level);

        let job_config_root =
            std::env::var("CLOUDJOB_JOB_CONFIG_ROOT").unwrap_or(defaults.job_config_root);

        let ready_root = std::env::var("CLOUDJOB_READY_ROOT").unwrap_or(defaults.ready_root);

        let ready_queue_size = match std::env::var("CLOUDJOB_READY_QUEUE_SIZE") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.ready_queue_size,
        };

        let shutdown_timeout = match std::env::var("CLOUDJOB_SHUTDOWN_TIMEOUT_SECS") {
            Ok(v) => Duration::from_secs(v.parse()?),
            Err(_) => defaults.shutdown_timeout,
        };

        let mesos = MesosConfig {
            user: std::env::var("CLOUDJOB_MESOS_USER").unwrap_or(defaults.mesos.user),
            url: std::env::var("CLOUDJOB_MESOS_URL").unwrap_or(defaults.mesos.url),
            hostname: std::env::var("CLOUDJOB_HOSTNAME").unwrap_or(defaults.mesos.hostname),
        };

        for (name, root) in [
            ("CLOUDJOB_JOB_CONFIG_ROOT", &job_config_root),
            ("CLOUDJOB_READY_ROOT", &ready_root),
        ] {
            if !root.starts_with('/') || root.len() < 2 || root.ends_with('/') {
                anyhow::bail!("{name} must be an absolute node path without a trailing '/', got '{root}'");
            }
        }

        Ok(Self {
            log_level,
            job_config_root,
            ready_root,
            ready_queue_size,
            shutdown_timeout,
            mesos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.job_config_root, "/config/job");
        assert_eq!(config.ready_root, "/state/ready");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_failover_timeout_is_one_week() {
        assert_eq!(FRAMEWORK_FAILOVER_TIMEOUT.as_secs(), 604_800);
    }
}
