// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration validation warnings and errors.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Configuration validation started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_inkwell::observability::messages::validation::ValidationStarted;
///
/// let msg = ValidationStarted {
///     pipeline: "storyboard",
///     skill_count: 2,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ValidationStarted<'a> {
    pub pipeline: &'a str,
    pub skill_count: usize,
}

impl Display for ValidationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting configuration validation for pipeline '{}' with {} skills",
            self.pipeline, self.skill_count
        )
    }
}

impl StructuredLog for ValidationStarted<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            skill_count = self.skill_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            pipeline = self.pipeline,
            skill_count = self.skill_count,
        )
    }
}

/// Configuration validation completed successfully.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ValidationCompleted<'a> {
    pub pipeline: &'a str,
    pub skill_count: usize,
}

impl Display for ValidationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Configuration validation completed successfully for pipeline '{}' ({} skills)",
            self.pipeline, self.skill_count
        )
    }
}

impl StructuredLog for ValidationCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            skill_count = self.skill_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            pipeline = self.pipeline,
            skill_count = self.skill_count,
        )
    }
}

/// Configuration validation failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_inkwell::observability::messages::validation::ValidationFailed;
///
/// let msg = ValidationFailed {
///     error_count: 3,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ValidationFailed {
    pub error_count: usize,
}

impl Display for ValidationFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Configuration validation failed with {} errors",
            self.error_count
        )
    }
}

impl StructuredLog for ValidationFailed {
    fn log(&self) {
        tracing::error!(
            error_count = self.error_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            error_count = self.error_count,
        )
    }
}

/// An environment placeholder in the configuration had no value.
///
/// # Log Level
/// `warn!` - The placeholder resolves to an empty string
pub struct UnresolvedPlaceholder<'a> {
    pub variable: &'a str,
}

impl Display for UnresolvedPlaceholder<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Environment variable '{}' is not set, substituting an empty string",
            self.variable
        )
    }
}

impl StructuredLog for UnresolvedPlaceholder<'_> {
    fn log(&self) {
        tracing::warn!(variable = self.variable, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::WARN,
            "span_name",
            name = name,
            variable = self.variable,
        )
    }
}
