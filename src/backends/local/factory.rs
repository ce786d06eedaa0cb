// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::{
    EchoTextGenerator, FileSystemStorage, InMemoryStorage, PassthroughCompressor,
    SvgPlaceholderGenerator,
};
use crate::config::{BackendConfig, BackendType, StorageConfig, StorageType};
use crate::errors::SkillFactoryError;
use crate::traits::{ArtifactCompressor, ArtifactGenerator, StorageSink, TextGenerator};

const ECHO_TEXT: &str = "echo_text";
const SVG_PLACEHOLDER: &str = "svg_placeholder";

/// Factory for creating local (in-process) collaborator instances
pub struct LocalBackendFactory;

impl LocalBackendFactory {
    /// Create a text generator from configuration
    ///
    /// The `implementation` field selects the generator, defaulting to `echo_text`:
    /// - "echo_text" -> EchoTextGenerator (options: `response`)
    pub fn create_text_generator(
        config: &BackendConfig,
    ) -> Result<Arc<dyn TextGenerator>, SkillFactoryError> {
        Self::ensure_local("text", config.backend)?;
        match config.implementation.as_deref().unwrap_or(ECHO_TEXT) {
            ECHO_TEXT => Ok(Arc::new(EchoTextGenerator::from_options(&config.options))),
            other => Err(SkillFactoryError::UnknownImplementation {
                role: "text",
                implementation: other.to_string(),
            }),
        }
    }

    /// Create an artifact generator from configuration
    ///
    /// The `implementation` field selects the generator, defaulting to `svg_placeholder`:
    /// - "svg_placeholder" -> SvgPlaceholderGenerator (options: `width`, `height`)
    pub fn create_artifact_generator(
        config: &BackendConfig,
    ) -> Result<Arc<dyn ArtifactGenerator>, SkillFactoryError> {
        Self::ensure_local("artifact", config.backend)?;
        match config.implementation.as_deref().unwrap_or(SVG_PLACEHOLDER) {
            SVG_PLACEHOLDER => Ok(Arc::new(SvgPlaceholderGenerator::from_options(
                &config.options,
            ))),
            other => Err(SkillFactoryError::UnknownImplementation {
                role: "artifact",
                implementation: other.to_string(),
            }),
        }
    }

    pub fn create_storage(config: &StorageConfig) -> Arc<dyn StorageSink> {
        match config.storage {
            StorageType::Filesystem => Arc::new(FileSystemStorage::new(config.root.clone())),
            StorageType::Memory => Arc::new(InMemoryStorage::new()),
        }
    }

    pub fn create_compressor() -> Arc<dyn ArtifactCompressor> {
        Arc::new(PassthroughCompressor)
    }

    /// List all available local generator implementations
    pub fn list_available_implementations() -> Vec<&'static str> {
        vec![ECHO_TEXT, SVG_PLACEHOLDER]
    }

    /// Check if an implementation is available
    pub fn is_implementation_available(name: &str) -> bool {
        Self::list_available_implementations().contains(&name)
    }

    fn ensure_local(role: &'static str, backend: BackendType) -> Result<(), SkillFactoryError> {
        match backend {
            BackendType::Local => Ok(()),
            other => Err(SkillFactoryError::BackendNotImplemented {
                role,
                backend: other,
            }),
        }
    }
}
