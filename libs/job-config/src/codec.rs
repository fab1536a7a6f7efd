//! JSON codec for job configuration payloads.

use crate::{CloudJobConfiguration, DecodeError};

/// Decode and validate a stored job configuration payload.
pub fn decode(bytes: &[u8]) -> Result<CloudJobConfiguration, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let config: CloudJobConfiguration = serde_json::from_slice(bytes)?;
    config.validate()?;
    Ok(config)
}

/// Encode a job configuration for storage.
pub fn encode(config: &CloudJobConfiguration) -> Result<Vec<u8>, DecodeError> {
    config.validate()?;
    Ok(serde_json::to_vec(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CloudJobExecutionType;
    use proptest::prelude::*;

    #[test]
    fn test_decode_minimal_payload_applies_defaults() {
        let config = decode(br#"{"jobName":"job-A","jobExecutionType":"DAEMON"}"#).unwrap();
        assert_eq!(config.job_name, "job-A");
        assert_eq!(config.job_execution_type, CloudJobExecutionType::Daemon);
        assert!(config.misfire);
        assert_eq!(config.sharding_total_count, 1);
    }

    #[test]
    fn test_decode_accepts_misfire_enabled_alias() {
        let config = decode(
            br#"{"jobName":"job-B","jobExecutionType":"ONE_OFF","misfireEnabled":false}"#,
        )
        .unwrap();
        assert!(!config.misfire);
    }

    #[test]
    fn test_decode_reads_memory_mb_key() {
        let config = decode(
            br#"{"jobName":"j","jobExecutionType":"ONE_OFF","memoryMB":512.0,"cpuCount":2}"#,
        )
        .unwrap();
        assert_eq!(config.memory_mb, 512.0);
        assert_eq!(config.cpu_count, 2.0);
    }

    #[test]
    fn test_decode_empty_payload() {
        assert!(matches!(decode(b""), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_decode_truncated_payload() {
        assert!(matches!(
            decode(br#"{"jobName":"job-C","jobExec"#),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_decode_unknown_execution_type() {
        assert!(decode(br#"{"jobName":"j","jobExecutionType":"FOREVER"}"#).is_err());
    }

    #[test]
    fn test_decode_runs_validation() {
        let err = decode(br#"{"jobName":"","jobExecutionType":"ONE_OFF"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Invalid { field: "jobName", .. }));
    }

    #[test]
    fn test_encode_rejects_invalid_record() {
        let config = CloudJobConfiguration::new("", CloudJobExecutionType::OneOff);
        assert!(encode(&config).is_err());
    }

    #[test]
    fn test_encoded_keys_are_camel_case() {
        let config = CloudJobConfiguration::new("j", CloudJobExecutionType::Transient)
            .with_cron("0 0 * * * ?");
        let value: serde_json::Value = serde_json::from_slice(&encode(&config).unwrap()).unwrap();
        assert_eq!(value["jobName"], "j");
        assert_eq!(value["jobExecutionType"], "TRANSIENT");
        assert_eq!(value["memoryMB"], 128.0);
        assert!(value.get("appName").is_none());
    }

    proptest! {
        #[test]
        fn decode_never_panics_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = decode(&bytes);
        }
    }
}
