// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised inside a skill boundary.
//!
//! These never escape `Skill::execute`: the wrapper folds every variant into a
//! failed `SkillResult` carrying the rendered message.

use thiserror::Error;

use crate::errors::{BatchError, GenerationError, StorageError};

#[derive(Error, Debug)]
pub enum SkillError {
    /// A required input was absent or empty. Raised before any remote call.
    #[error("skill '{skill}' requires input '{input}'")]
    MissingInput { skill: String, input: String },

    /// The input was present but unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Any fault from a generation collaborator.
    #[error(transparent)]
    RemoteCall(#[from] GenerationError),

    /// A collaborator fault the skill could classify for the user.
    #[error("{summary}: {source}")]
    Diagnosed {
        summary: String,
        #[source]
        source: GenerationError,
    },

    /// An artifact could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A batch run could not be started or addressed.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// Structured output could not be extracted by any strategy.
    #[error("failed to parse structured output: {0}")]
    Parse(String),

    /// The skill body panicked; the payload message is preserved.
    #[error("skill panicked: {0}")]
    Panicked(String),

    #[error("cancelled")]
    Cancelled,
}

impl SkillError {
    /// Build a `Panicked` error from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        SkillError::Panicked(panic_message(payload.as_ref()))
    }
}

/// Render a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payload_rendering() {
        let err = SkillError::from_panic(Box::new("boom"));
        assert_eq!(err.to_string(), "skill panicked: boom");

        let err = SkillError::from_panic(Box::new(String::from("owned boom")));
        assert_eq!(err.to_string(), "skill panicked: owned boom");

        let err = SkillError::from_panic(Box::new(42_u32));
        assert_eq!(err.to_string(), "skill panicked: unknown panic");
    }

    #[test]
    fn test_remote_call_is_transparent() {
        let err: SkillError = GenerationError::remote("429 quota exhausted").into();
        assert_eq!(err.to_string(), "remote generation failed: 429 quota exhausted");
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err: SkillError = StorageError::Rejected {
            filename: "../0.png".to_string(),
            reason: "path traversal".to_string(),
        }
        .into();
        assert!(matches!(err, SkillError::Storage(_)));
        assert_eq!(err.to_string(), "storage rejected '../0.png': path traversal");
    }
}
