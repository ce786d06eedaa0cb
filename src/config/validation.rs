// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of pipeline configurations.
//!
//! Validation runs before any skill is built and accumulates every problem it
//! finds, so a user sees all issues at once rather than fixing them one by one:
//!
//! 1. **Non-empty**: the pipeline declares at least one skill
//! 2. **Unique names**: skill names key the run's result map and must not collide
//! 3. **Known kinds**: every `kind` is one the [`SkillFactory`] can build
//!
//! Skill options are not checked here. Each skill validates its own options
//! when it executes.
//!
//! # Examples
//!
//! ```rust
//! use the_inkwell::config::{parse_config, validate_pipeline_config};
//! use the_inkwell::errors::ValidationError;
//!
//! let config = parse_config(
//!     "name: broken\nskills:\n  - {name: a, kind: outline}\n  - {name: a, kind: mystery}\n",
//! )?;
//!
//! let errors = validate_pipeline_config(&config).unwrap_err();
//! assert_eq!(errors.len(), 2);
//! assert!(matches!(errors[0], ValidationError::DuplicateSkillName { .. }));
//! # Ok::<(), the_inkwell::errors::ConfigError>(())
//! ```

use std::collections::HashSet;

use crate::config::{PipelineConfig, SkillFactory};
use crate::errors::ValidationError;
use crate::observability::messages::validation::{
    ValidationCompleted, ValidationFailed, ValidationStarted,
};
use crate::observability::messages::StructuredLog;

/// Validate a pipeline configuration, returning every error found.
pub fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    ValidationStarted {
        pipeline: &config.name,
        skill_count: config.skills.len(),
    }
    .log();

    let mut errors = Vec::new();

    if config.skills.is_empty() {
        errors.push(ValidationError::EmptyPipeline {
            pipeline: config.name.clone(),
        });
    }
    errors.extend(duplicate_skill_names(config));
    errors.extend(unknown_skill_kinds(config));

    if errors.is_empty() {
        ValidationCompleted {
            pipeline: &config.name,
            skill_count: config.skills.len(),
        }
        .log();
        Ok(())
    } else {
        ValidationFailed {
            error_count: errors.len(),
        }
        .log();
        Err(errors)
    }
}

fn duplicate_skill_names(config: &PipelineConfig) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    config
        .skills
        .iter()
        .filter(|skill| !seen.insert(skill.name.as_str()))
        .map(|skill| ValidationError::DuplicateSkillName {
            skill_name: skill.name.clone(),
        })
        .collect()
}

fn unknown_skill_kinds(config: &PipelineConfig) -> Vec<ValidationError> {
    config
        .skills
        .iter()
        .filter(|skill| !SkillFactory::is_kind_available(&skill.kind))
        .map(|skill| ValidationError::UnknownSkillKind {
            skill_name: skill.name.clone(),
            kind: skill.kind.clone(),
        })
        .collect()
}
