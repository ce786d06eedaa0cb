// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors reported by external collaborators: generation backends and storage sinks.
//!
//! Retry and timeout policy belong to the collaborator, so these types only carry
//! enough information for the core to record a failure and surface a message.

use std::time::Duration;
use thiserror::Error;

/// Failure reported by a text or artifact generation backend.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The remote service rejected or failed the request.
    #[error("remote generation failed: {message}")]
    Remote {
        message: String,
        /// Classification supplied by the backend; the core never acts on it.
        retryable: bool,
    },

    /// The backend gave up waiting on the remote service.
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    /// The backend returned a payload that could not be used.
    #[error("invalid generation response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    pub fn remote(message: impl Into<String>) -> Self {
        GenerationError::Remote {
            message: message.into(),
            retryable: true,
        }
    }
}

/// Failure reported by a storage sink while persisting an artifact.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage rejected '{filename}': {reason}")]
    Rejected { filename: String, reason: String },
}
