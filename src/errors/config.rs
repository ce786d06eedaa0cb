// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use thiserror::Error;

use crate::errors::SkillFactoryError;

/// Errors that can occur during pipeline configuration validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The pipeline declares no skills at all
    EmptyPipeline {
        /// Name of the offending pipeline
        pipeline: String,
    },
    /// Two skills share the same name, so their results would collide in the run context
    DuplicateSkillName {
        /// The duplicate skill name
        skill_name: String,
    },
    /// A skill references a kind the skill factory cannot build
    UnknownSkillKind {
        /// The skill declaring the kind
        skill_name: String,
        /// The unrecognized kind
        kind: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyPipeline { pipeline } => {
                write!(f, "Pipeline '{}' declares no skills", pipeline)
            }
            ValidationError::DuplicateSkillName { skill_name } => {
                write!(f, "Duplicate skill name: '{}'", skill_name)
            }
            ValidationError::UnknownSkillKind { skill_name, kind } => {
                write!(
                    f,
                    "Skill '{}' uses kind '{}' which is not registered",
                    skill_name, kind
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while loading a pipeline configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration validation failed:\n{}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("unknown pipeline '{0}'")]
    UnknownPipeline(String),

    #[error("failed to build pipeline: {0}")]
    Build(#[from] SkillFactoryError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
