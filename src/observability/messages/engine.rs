// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline run lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Pipeline run start, completion and failure
//! * Step dispatch
//! * Cancellation requests

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Pipeline run started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_inkwell::observability::messages::engine::PipelineRunStarted;
///
/// let msg = PipelineRunStarted {
///     pipeline: "storyboard",
///     run_id: "4f7c",
///     total_steps: 3,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PipelineRunStarted<'a> {
    pub pipeline: &'a str,
    pub run_id: &'a str,
    pub total_steps: usize,
}

impl Display for PipelineRunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting pipeline '{}' run {}: {} steps",
            self.pipeline, self.run_id, self.total_steps
        )
    }
}

impl StructuredLog for PipelineRunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            run_id = self.run_id,
            total_steps = self.total_steps,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_run",
            span_name = name,
            pipeline = self.pipeline,
            run_id = self.run_id,
            total_steps = self.total_steps,
        )
    }
}

/// A pipeline step is about to execute.
///
/// # Log Level
/// `debug!` - Per-step detail
pub struct PipelineStepStarted<'a> {
    pub pipeline: &'a str,
    pub step: usize,
    pub skill: &'a str,
}

impl Display for PipelineStepStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' step {} dispatching skill '{}'",
            self.pipeline, self.step, self.skill
        )
    }
}

impl StructuredLog for PipelineStepStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            pipeline = self.pipeline,
            step = self.step,
            skill = self.skill,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "pipeline_step",
            span_name = name,
            pipeline = self.pipeline,
            step = self.step,
            skill = self.skill,
        )
    }
}

/// Pipeline run completed with every step succeeding.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_inkwell::observability::messages::engine::PipelineRunCompleted;
/// use std::time::Duration;
///
/// let msg = PipelineRunCompleted {
///     pipeline: "storyboard",
///     run_id: "4f7c",
///     duration: Duration::from_millis(1250),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PipelineRunCompleted<'a> {
    pub pipeline: &'a str,
    pub run_id: &'a str,
    pub duration: Duration,
}

impl Display for PipelineRunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' run {} completed in {:?}",
            self.pipeline, self.run_id, self.duration
        )
    }
}

impl StructuredLog for PipelineRunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            run_id = self.run_id,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_run_completed",
            span_name = name,
            pipeline = self.pipeline,
            run_id = self.run_id,
            duration = ?self.duration,
        )
    }
}

/// Pipeline run stopped at a failing step.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_inkwell::observability::messages::engine::PipelineRunFailed;
///
/// let msg = PipelineRunFailed {
///     pipeline: "storyboard",
///     run_id: "4f7c",
///     step: 2,
///     skill: "generate_artifacts",
///     error: "remote generation failed: quota exhausted",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct PipelineRunFailed<'a> {
    pub pipeline: &'a str,
    pub run_id: &'a str,
    pub step: usize,
    pub skill: &'a str,
    pub error: &'a str,
}

impl Display for PipelineRunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' run {} failed at step {} ('{}'): {}",
            self.pipeline, self.run_id, self.step, self.skill, self.error
        )
    }
}

impl StructuredLog for PipelineRunFailed<'_> {
    fn log(&self) {
        tracing::error!(
            pipeline = self.pipeline,
            run_id = self.run_id,
            step = self.step,
            skill = self.skill,
            error = self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "pipeline_run_failed",
            span_name = name,
            pipeline = self.pipeline,
            run_id = self.run_id,
            step = self.step,
            skill = self.skill,
        )
    }
}

/// Pipeline run observed a cancellation request and stopped before a step.
///
/// # Log Level
/// `warn!` - Run ended early on request
pub struct PipelineRunCancelled<'a> {
    pub pipeline: &'a str,
    pub run_id: &'a str,
    pub completed_steps: usize,
}

impl Display for PipelineRunCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' run {} cancelled after {} completed steps",
            self.pipeline, self.run_id, self.completed_steps
        )
    }
}

impl StructuredLog for PipelineRunCancelled<'_> {
    fn log(&self) {
        tracing::warn!(
            pipeline = self.pipeline,
            run_id = self.run_id,
            completed_steps = self.completed_steps,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "pipeline_run_cancelled",
            span_name = name,
            pipeline = self.pipeline,
            run_id = self.run_id,
            completed_steps = self.completed_steps,
        )
    }
}
