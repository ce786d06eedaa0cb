// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::Arc;

use crate::backends::local::LocalBackendFactory;
use crate::batch::BatchRunRegistry;
use crate::config::{BackendsConfig, PipelineConfig, SkillFactory};
use crate::engine::Pipeline;
use crate::errors::SkillFactoryError;
use crate::traits::{ArtifactCompressor, ArtifactGenerator, StorageSink, TextGenerator};

/// Collaborator instances shared by the skills of one pipeline.
///
/// Hosts with remote backends build this directly and hand it to
/// [`RuntimeBuilder::with_collaborators`]; [`Collaborators::from_backends`]
/// covers the local ones.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub text: Option<Arc<dyn TextGenerator>>,
    pub artifact: Option<Arc<dyn ArtifactGenerator>>,
    pub storage: Option<Arc<dyn StorageSink>>,
    pub compressor: Option<Arc<dyn ArtifactCompressor>>,
    /// Shared run state for batch skills, so a host can retry tasks of earlier runs.
    pub batch_registry: Option<Arc<BatchRunRegistry>>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("text", &self.text.as_ref().map(|t| t.name()))
            .field("artifact", &self.artifact.as_ref().map(|a| a.name()))
            .field("storage", &self.storage.is_some())
            .field("compressor", &self.compressor.is_some())
            .field("batch_registry", &self.batch_registry.is_some())
            .finish()
    }
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every collaborator from configuration using the local backends.
    pub fn from_backends(config: &BackendsConfig) -> Result<Self, SkillFactoryError> {
        Ok(Self {
            text: Some(LocalBackendFactory::create_text_generator(&config.text)?),
            artifact: Some(LocalBackendFactory::create_artifact_generator(&config.artifact)?),
            storage: Some(LocalBackendFactory::create_storage(&config.storage)),
            compressor: Some(LocalBackendFactory::create_compressor()),
            batch_registry: None,
        })
    }

    pub fn with_text(mut self, text: Arc<dyn TextGenerator>) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_artifact(mut self, artifact: Arc<dyn ArtifactGenerator>) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn StorageSink>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn ArtifactCompressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn with_batch_registry(mut self, registry: Arc<BatchRunRegistry>) -> Self {
        self.batch_registry = Some(registry);
        self
    }
}

/// Pipeline runtime builder - turns a configuration into a ready [`Pipeline`].
///
/// # Examples
///
/// ```
/// use the_inkwell::config::{parse_config, RuntimeBuilder};
///
/// let config = parse_config(
///     "name: notes\nbackends:\n  storage: {type: memory}\nskills:\n  - {name: analyze, kind: analyze}\n",
/// )?;
///
/// let pipeline = RuntimeBuilder::from_config(&config)?;
/// assert_eq!(pipeline.skill_names(), vec!["analyze"]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build a pipeline whose collaborators come from the configured local backends.
    pub fn from_config(cfg: &PipelineConfig) -> Result<Pipeline, SkillFactoryError> {
        let collaborators = Collaborators::from_backends(&cfg.backends)?;
        Self::with_collaborators(cfg, &collaborators)
    }

    /// Build a pipeline around caller-supplied collaborators.
    pub fn with_collaborators(
        cfg: &PipelineConfig,
        collaborators: &Collaborators,
    ) -> Result<Pipeline, SkillFactoryError> {
        let skills = cfg
            .skills
            .iter()
            .map(|skill| SkillFactory::create_skill(skill, collaborators))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Pipeline::new(cfg.name.clone(), skills)
            .with_description(cfg.description.clone())
            .with_variables(cfg.variables.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, BackendType};

    #[test]
    fn test_from_backends_builds_local_collaborators() {
        let collaborators = Collaborators::from_backends(&BackendsConfig::default()).unwrap();

        assert_eq!(collaborators.text.unwrap().name(), "echo_text");
        assert_eq!(collaborators.artifact.unwrap().name(), "svg_placeholder");
        assert!(collaborators.storage.is_some());
        assert!(collaborators.batch_registry.is_none());
    }

    #[test]
    fn test_remote_backends_are_rejected() {
        let mut backends = BackendsConfig::default();
        backends.artifact.backend = BackendType::Http;

        let err = Collaborators::from_backends(&backends).unwrap_err();
        assert!(matches!(err, SkillFactoryError::BackendNotImplemented { .. }));
    }

    #[test]
    fn test_builder_carries_config_identity() {
        let config = parse_config(
            "name: storyboard\ndescription: two steps\nvariables: {tone: calm}\n\
             backends:\n  storage: {type: memory}\n\
             skills:\n  - {name: outline, kind: outline}\n  - {name: render, kind: generate_artifacts}\n",
        )
        .unwrap();

        let pipeline = RuntimeBuilder::from_config(&config).unwrap();

        assert_eq!(pipeline.name(), "storyboard");
        assert_eq!(pipeline.description(), "two steps");
        assert_eq!(pipeline.skill_names(), vec!["outline", "render"]);
    }

    #[test]
    fn test_missing_collaborator_fails_the_build() {
        let config = parse_config("name: p\nskills:\n  - {name: outline, kind: outline}\n").unwrap();

        let err = RuntimeBuilder::with_collaborators(&config, &Collaborators::new()).unwrap_err();
        assert!(matches!(err, SkillFactoryError::MissingCollaborator { .. }));
    }
}
