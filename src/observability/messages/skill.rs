// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for skill execution and lifecycle events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Skill execution started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_inkwell::observability::messages::skill::SkillExecutionStarted;
///
/// let msg = SkillExecutionStarted {
///     skill: "outline",
///     version: "1.0.0",
///     step: Some(1),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct SkillExecutionStarted<'a> {
    pub skill: &'a str,
    pub version: &'a str,
    pub step: Option<u64>,
}

impl Display for SkillExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.step {
            Some(step) => write!(
                f,
                "Skill '{}' v{} execution started at step {}",
                self.skill, self.version, step
            ),
            None => write!(f, "Skill '{}' v{} execution started", self.skill, self.version),
        }
    }
}

impl StructuredLog for SkillExecutionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            skill = self.skill,
            version = self.version,
            step = self.step,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "skill_execution",
            span_name = name,
            skill = self.skill,
            version = self.version,
            step = self.step,
        )
    }
}

/// Skill execution completed successfully.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SkillExecutionCompleted<'a> {
    pub skill: &'a str,
    pub duration: Duration,
}

impl Display for SkillExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skill '{}' execution completed in {:?}",
            self.skill, self.duration
        )
    }
}

impl StructuredLog for SkillExecutionCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            skill = self.skill,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "skill_completed",
            span_name = name,
            skill = self.skill,
            duration = ?self.duration,
        )
    }
}

/// Skill execution produced a failed result.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_inkwell::observability::messages::skill::SkillExecutionFailed;
///
/// let msg = SkillExecutionFailed {
///     skill: "outline",
///     error: "skill 'outline' requires input 'topic'",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct SkillExecutionFailed<'a> {
    pub skill: &'a str,
    pub error: &'a str,
}

impl Display for SkillExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Skill '{}' execution failed: {}", self.skill, self.error)
    }
}

impl StructuredLog for SkillExecutionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            skill = self.skill,
            error = self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "skill_failed",
            span_name = name,
            skill = self.skill,
            error = self.error,
        )
    }
}

/// Structured output was recovered by a fallback extraction strategy.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct StructuredOutputRecovered<'a> {
    pub skill: &'a str,
    pub strategy: &'a str,
}

impl Display for StructuredOutputRecovered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skill '{}' recovered structured output using {} extraction",
            self.skill, self.strategy
        )
    }
}

impl StructuredLog for StructuredOutputRecovered<'_> {
    fn log(&self) {
        tracing::debug!(skill = self.skill, strategy = self.strategy, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "structured_output",
            span_name = name,
            skill = self.skill,
            strategy = self.strategy,
        )
    }
}
