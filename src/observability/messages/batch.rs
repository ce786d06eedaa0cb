// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for batch generation runs.
//!
//! This module contains message types for logging events related to:
//! * Batch run start and completion
//! * Reference artifact generation
//! * Per-task failures and single-task retries
//! * Run state disposal

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Batch run started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_inkwell::observability::messages::batch::BatchRunStarted;
///
/// let msg = BatchRunStarted {
///     run_id: "4f7c",
///     total: 6,
///     mode: "sequential",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct BatchRunStarted<'a> {
    pub run_id: &'a str,
    pub total: usize,
    pub mode: &'a str,
}

impl Display for BatchRunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting batch run {}: {} tasks, {} mode",
            self.run_id, self.total, self.mode
        )
    }
}

impl StructuredLog for BatchRunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = self.run_id,
            total = self.total,
            mode = self.mode,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "batch_run",
            span_name = name,
            run_id = self.run_id,
            total = self.total,
            mode = self.mode,
        )
    }
}

/// Reference artifact generation outcome.
///
/// # Log Level
/// `info!` on success, `warn!` when the batch continues without a reference
pub struct ReferenceOutcome<'a> {
    pub run_id: &'a str,
    pub index: usize,
    pub error: Option<&'a str>,
}

impl Display for ReferenceOutcome<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.error {
            None => write!(
                f,
                "Batch run {} retained task {} as the reference artifact",
                self.run_id, self.index
            ),
            Some(error) => write!(
                f,
                "Batch run {} reference task {} failed, continuing without reference: {}",
                self.run_id, self.index, error
            ),
        }
    }
}

impl StructuredLog for ReferenceOutcome<'_> {
    fn log(&self) {
        match self.error {
            None => tracing::info!(run_id = self.run_id, index = self.index, "{}", self),
            Some(error) => tracing::warn!(
                run_id = self.run_id,
                index = self.index,
                error = error,
                "{}", self
            ),
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "batch_reference",
            span_name = name,
            run_id = self.run_id,
            index = self.index,
        )
    }
}

/// A single generation task failed. The batch continues.
///
/// # Log Level
/// `warn!` - Partial failure, retryable
///
/// # Example
/// ```
/// use the_inkwell::observability::messages::batch::TaskGenerationFailed;
///
/// let msg = TaskGenerationFailed {
///     run_id: "4f7c",
///     index: 3,
///     error: "remote generation failed: 429",
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct TaskGenerationFailed<'a> {
    pub run_id: &'a str,
    pub index: usize,
    pub error: &'a str,
}

impl Display for TaskGenerationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Batch run {} task {} failed: {}",
            self.run_id, self.index, self.error
        )
    }
}

impl StructuredLog for TaskGenerationFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            run_id = self.run_id,
            index = self.index,
            error = self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "batch_task_failed",
            span_name = name,
            run_id = self.run_id,
            index = self.index,
        )
    }
}

/// Batch run finished, possibly with partial failure.
///
/// # Log Level
/// `info!` when every task succeeded, `warn!` otherwise
pub struct BatchRunCompleted<'a> {
    pub run_id: &'a str,
    pub completed: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl Display for BatchRunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.failed == 0 {
            write!(
                f,
                "Batch run {} completed: {} artifacts in {:?}",
                self.run_id, self.completed, self.duration
            )
        } else {
            write!(
                f,
                "Batch run {} completed with failures: {} succeeded, {} failed in {:?}",
                self.run_id, self.completed, self.failed, self.duration
            )
        }
    }
}

impl StructuredLog for BatchRunCompleted<'_> {
    fn log(&self) {
        if self.failed == 0 {
            tracing::info!(
                run_id = self.run_id,
                completed = self.completed,
                failed = self.failed,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        } else {
            tracing::warn!(
                run_id = self.run_id,
                completed = self.completed,
                failed = self.failed,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "batch_run_completed",
            span_name = name,
            run_id = self.run_id,
            completed = self.completed,
            failed = self.failed,
        )
    }
}

/// A single task of an earlier run is being regenerated.
///
/// # Log Level
/// `info!` - Operator-initiated action
pub struct TaskRetryRequested<'a> {
    pub run_id: &'a str,
    pub index: usize,
    pub use_reference: bool,
}

impl Display for TaskRetryRequested<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Retrying task {} of batch run {} (reference: {})",
            self.index, self.run_id, self.use_reference
        )
    }
}

impl StructuredLog for TaskRetryRequested<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = self.run_id,
            index = self.index,
            use_reference = self.use_reference,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "batch_retry",
            span_name = name,
            run_id = self.run_id,
            index = self.index,
        )
    }
}

/// Batch run state was released.
///
/// # Log Level
/// `debug!` - Bookkeeping
pub struct RunStateReleased<'a> {
    pub run_id: &'a str,
    pub reason: &'a str,
}

impl Display for RunStateReleased<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Released batch run state {} ({})", self.run_id, self.reason)
    }
}

impl StructuredLog for RunStateReleased<'_> {
    fn log(&self) {
        tracing::debug!(run_id = self.run_id, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "batch_state_released",
            span_name = name,
            run_id = self.run_id,
            reason = self.reason,
        )
    }
}
