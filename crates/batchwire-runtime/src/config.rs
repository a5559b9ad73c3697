//! Scheduler configuration

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{BatchPolicy, ConfigError};

/// Batching knobs exposed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Largest number of items sent in one call
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Longest time the oldest queued item waits for its batch to fill
    #[serde(default = "default_max_wait_latency_ms")]
    pub max_wait_latency_ms: u64,

    /// Items a lazy sequence submits ahead of its read position
    #[serde(default = "default_look_ahead_window")]
    pub look_ahead_window: usize,

    /// Bound on each batch call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Batches allowed on the wire at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_max_batch_size() -> usize {
    128
}

fn default_max_wait_latency_ms() -> u64 {
    10
}

fn default_look_ahead_window() -> usize {
    4
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_in_flight() -> usize {
    4
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_wait_latency_ms: default_max_wait_latency_ms(),
            look_ahead_window: default_look_ahead_window(),
            request_timeout_ms: default_request_timeout_ms(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.look_ahead_window == 0 {
            return Err(ConfigError::ZeroLookAhead);
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroInFlight);
        }
        Ok(())
    }

    pub fn with_max_batch_size(mut self, n: usize) -> Self {
        self.max_batch_size = n;
        self
    }

    pub fn with_max_wait_latency(mut self, latency: Duration) -> Self {
        self.max_wait_latency_ms = latency.as_millis() as u64;
        self
    }

    pub fn with_look_ahead_window(mut self, n: usize) -> Self {
        self.look_ahead_window = n;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n;
        self
    }

    pub fn max_wait_latency(&self) -> Duration {
        Duration::from_millis(self.max_wait_latency_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            max_batch: self.max_batch_size,
            max_delay: self.max_wait_latency(),
            max_in_flight: self.max_in_flight,
            request_timeout: self.request_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_yaml() {
        let yaml = r#"
max_batch_size: 32
max_wait_latency_ms: 50
look_ahead_window: 8
"#;
        let config: SchedulerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_batch_size, 32);
        assert_eq!(config.max_wait_latency(), Duration::from_millis(50));
        assert_eq!(config.look_ahead_window, 8);
        assert_eq!(config.request_timeout_ms, 30_000);
        assert_eq!(config.max_in_flight, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config: SchedulerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.max_batch_size, 128);
    }

    #[test]
    fn test_validate_rejects_zero_knobs() {
        let base = SchedulerConfig::default();
        assert_eq!(
            base.clone().with_max_batch_size(0).validate(),
            Err(ConfigError::ZeroBatchSize)
        );
        assert_eq!(
            base.clone().with_look_ahead_window(0).validate(),
            Err(ConfigError::ZeroLookAhead)
        );
        assert_eq!(
            base.clone()
                .with_request_timeout(Duration::ZERO)
                .validate(),
            Err(ConfigError::ZeroTimeout)
        );
        assert_eq!(
            base.with_max_in_flight(0).validate(),
            Err(ConfigError::ZeroInFlight)
        );
    }

    #[test]
    fn test_zero_latency_is_allowed() {
        let config = SchedulerConfig::default().with_max_wait_latency(Duration::ZERO);
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_policy().max_delay, Duration::ZERO);
    }

    #[test]
    fn test_from_json_file_validates() {
        let dir = std::env::temp_dir().join(format!("batchwire-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scheduler.json");
        std::fs::write(&path, r#"{"max_batch_size": 0}"#).unwrap();
        assert!(SchedulerConfig::from_json(&path).is_err());

        std::fs::write(&path, r#"{"max_batch_size": 3, "max_wait_latency_ms": 50}"#).unwrap();
        let config = SchedulerConfig::from_json(&path).unwrap();
        assert_eq!(config.batch_policy().max_batch, 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
