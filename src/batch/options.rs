// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::errors::BatchError;

/// How the tasks after the reference are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConcurrencyMode {
    /// One at a time with a fixed delay between calls.
    #[default]
    Sequential,
    /// Up to `max_workers` calls in flight, collected in completion order.
    #[serde(alias = "bounded_concurrent", alias = "concurrent")]
    BoundedConcurrent,
}

impl ConcurrencyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcurrencyMode::Sequential => "sequential",
            ConcurrencyMode::BoundedConcurrent => "bounded-concurrent",
        }
    }
}

/// Batch scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub concurrency_mode: ConcurrencyMode,
    pub max_workers: usize,
    /// Delay between sequential calls, in seconds.
    pub request_delay_seconds: f64,
    /// Category of the task generated first and used as the reference.
    pub reference_tag: String,
    pub reference_max_bytes: usize,
    /// Thumbnail budget; zero disables thumbnails.
    pub thumbnail_max_bytes: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency_mode: ConcurrencyMode::Sequential,
            max_workers: 1,
            request_delay_seconds: 35.0,
            reference_tag: "cover".to_string(),
            reference_max_bytes: 200 * 1024,
            thumbnail_max_bytes: 50 * 1024,
        }
    }
}

impl BatchOptions {
    /// Read the recognized keys from a skill options object. Unknown keys are ignored.
    pub fn from_options(options: &Map<String, Value>) -> Result<Self, BatchError> {
        let parsed: BatchOptions = serde_json::from_value(Value::Object(options.clone()))
            .map_err(|e| BatchError::InvalidOptions(e.to_string()))?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if self.max_workers == 0 {
            return Err(BatchError::InvalidOptions(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if Duration::try_from_secs_f64(self.request_delay_seconds).is_err() {
            return Err(BatchError::InvalidOptions(format!(
                "request_delay_seconds must be a non-negative number of representable seconds, got {}",
                self.request_delay_seconds
            )));
        }
        Ok(())
    }

    /// Values `validate` rejects saturate instead of panicking.
    pub fn request_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_delay_seconds.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn with_mode(mut self, mode: ConcurrencyMode, max_workers: usize) -> Self {
        self.concurrency_mode = mode;
        self.max_workers = max_workers;
        self
    }

    pub fn with_request_delay(mut self, seconds: f64) -> Self {
        self.request_delay_seconds = seconds;
        self
    }
}
