// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Seams for the external collaborators the engine consumes.
//!
//! Generation backends, storage sinks and compressors are supplied by the host.
//! Retry, timeout and rate-limit compliance belong to these implementations;
//! the engine calls each method once per attempt and records the outcome.

use async_trait::async_trait;
use bytes::Bytes;

use crate::batch::GenerationRequest;
use crate::errors::{GenerationError, StorageError};

/// Tuning passed through to a text generation backend.
#[derive(Debug, Clone, Default)]
pub struct TextOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Reference artifacts the backend may condition on.
    pub references: Vec<Bytes>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        prompt: &str,
        options: &TextOptions,
    ) -> Result<String, GenerationError>;

    fn name(&self) -> &'static str;
}

/// Single-item artifact generator.
///
/// Must be safely callable repeatedly, sequentially or from several workers at once.
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
        reference: Option<&Bytes>,
    ) -> Result<Bytes, GenerationError>;

    /// Extension used when naming stored artifacts.
    fn file_extension(&self) -> &str {
        "png"
    }

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Persist `data` under `filename` for `run_id`, returning its location.
    async fn save(&self, run_id: &str, filename: &str, data: &Bytes) -> Result<String, StorageError>;
}

/// Shrinks an artifact to fit a byte budget. Returning the input unchanged is valid.
pub trait ArtifactCompressor: Send + Sync {
    fn compress(&self, data: &Bytes, max_bytes: usize) -> Bytes;
}
