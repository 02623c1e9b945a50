// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::{Path, PathBuf};

use crate::aggregator::SensorRange;
use crate::constants::{DEFAULT_LOG_LEVEL, DEFAULT_LOG_PATH, DEFAULT_TOP_N};
use crate::errors::ConfigError;
use crate::pipeline::PipelineConfig;

/// Configuration for a traffic report run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficConfig {
    /// Path of the traffic log to read
    pub log_path: PathBuf,
    /// Number of sensors listed in the congestion ranking
    pub top_n: usize,
    /// Maximum queued records before the reader blocks, unbounded when unset
    pub queue_capacity: Option<usize>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            top_n: DEFAULT_TOP_N,
            queue_capacity: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl TrafficConfig {
    /// Create configuration from environment variables.
    ///
    /// Each setting is checked on its own: a rejected value falls back to its
    /// default and is returned next to the config, the other settings are kept.
    /// Unparseable numbers are treated as unset.
    pub fn from_env() -> (Self, Vec<ConfigError>) {
        let defaults = Self::default();
        let mut rejected = Vec::new();

        let log_path = env::var("TRAFFIC_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_PATH));
        let top_n = env::var("TRAFFIC_TOP_N")
            .ok()
            .and_then(|top_n| top_n.parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_N);
        let queue_capacity = env::var("TRAFFIC_QUEUE_CAPACITY")
            .ok()
            .and_then(|capacity| capacity.parse::<usize>().ok());
        let log_level = env::var("TRAFFIC_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());

        let config = Self {
            log_path: checked(
                check_log_path(&log_path),
                log_path,
                defaults.log_path,
                &mut rejected,
            ),
            top_n: checked(check_top_n(top_n), top_n, defaults.top_n, &mut rejected),
            queue_capacity: checked(
                check_queue_capacity(queue_capacity),
                queue_capacity,
                defaults.queue_capacity,
                &mut rejected,
            ),
            log_level: checked(
                check_log_level(&log_level),
                log_level,
                defaults.log_level,
                &mut rejected,
            ),
        };
        (config, rejected)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_log_path(&self.log_path)?;
        check_top_n(self.top_n)?;
        check_queue_capacity(self.queue_capacity)?;
        check_log_level(&self.log_level)
    }

    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            log_path: self.log_path.clone(),
            queue_capacity: self.queue_capacity,
            sensor_range: SensorRange::default(),
        }
    }
}

fn checked<T>(
    check: Result<(), ConfigError>,
    value: T,
    default: T,
    rejected: &mut Vec<ConfigError>,
) -> T {
    match check {
        Ok(()) => value,
        Err(e) => {
            rejected.push(e);
            default
        }
    }
}

fn check_log_path(log_path: &Path) -> Result<(), ConfigError> {
    if log_path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidConfig(
            "TRAFFIC_LOG_PATH cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn check_top_n(top_n: usize) -> Result<(), ConfigError> {
    if top_n == 0 {
        return Err(ConfigError::InvalidConfig(
            "TRAFFIC_TOP_N must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn check_queue_capacity(queue_capacity: Option<usize>) -> Result<(), ConfigError> {
    if queue_capacity == Some(0) {
        return Err(ConfigError::InvalidConfig(
            "TRAFFIC_QUEUE_CAPACITY must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn check_log_level(log_level: &str) -> Result<(), ConfigError> {
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&log_level) {
        return Err(ConfigError::InvalidConfig(format!(
            "Invalid log level '{log_level}'. Must be one of: trace, debug, info, warn, error"
        )));
    }
    Ok(())
}
