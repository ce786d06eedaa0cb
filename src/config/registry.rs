// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::backends::local::LocalBackendFactory;
use crate::config::{Collaborators, SkillConfig};
use crate::errors::SkillFactoryError;
use crate::skills::{AnalyzeSkill, BatchGenerationSkill, ContentSkill, OutlineSkill};
use crate::traits::Skill;

const KINDS: [&str; 4] = [
    AnalyzeSkill::KIND,
    OutlineSkill::KIND,
    ContentSkill::KIND,
    BatchGenerationSkill::KIND,
];

/// Builds skills by kind name, wiring in the collaborators each kind needs.
pub struct SkillFactory;

impl SkillFactory {
    /// Build the skill `config` describes.
    ///
    /// Fails with [`SkillFactoryError::MissingCollaborator`] when the kind needs a
    /// collaborator `collaborators` does not carry. A missing compressor falls
    /// back to passthrough.
    pub fn create_skill(
        config: &SkillConfig,
        collaborators: &Collaborators,
    ) -> Result<Arc<dyn Skill>, SkillFactoryError> {
        let name = config.name.clone();
        let options = config.options.clone();

        match config.kind.as_str() {
            AnalyzeSkill::KIND => {
                let text = require(config, "text generator", collaborators.text.clone())?;
                Ok(Arc::new(AnalyzeSkill::new(name, options, text)))
            }
            OutlineSkill::KIND => {
                let text = require(config, "text generator", collaborators.text.clone())?;
                Ok(Arc::new(OutlineSkill::new(name, options, text)))
            }
            ContentSkill::KIND => {
                let text = require(config, "text generator", collaborators.text.clone())?;
                Ok(Arc::new(ContentSkill::new(name, options, text)))
            }
            BatchGenerationSkill::KIND => {
                let generator =
                    require(config, "artifact generator", collaborators.artifact.clone())?;
                let storage = require(config, "storage", collaborators.storage.clone())?;
                let compressor = collaborators
                    .compressor
                    .clone()
                    .unwrap_or_else(LocalBackendFactory::create_compressor);

                let skill = BatchGenerationSkill::new(name, options, generator, storage, compressor);
                Ok(Arc::new(match &collaborators.batch_registry {
                    Some(registry) => skill.with_registry(Arc::clone(registry)),
                    None => skill,
                }))
            }
            other => Err(SkillFactoryError::SkillCreationFailed {
                skill_name: config.name.clone(),
                reason: format!("unknown skill kind '{}'", other),
            }),
        }
    }

    pub fn list_available_kinds() -> Vec<&'static str> {
        KINDS.to_vec()
    }

    pub fn is_kind_available(kind: &str) -> bool {
        KINDS.contains(&kind)
    }
}

fn require<T: ?Sized>(
    config: &SkillConfig,
    collaborator: &'static str,
    value: Option<Arc<T>>,
) -> Result<Arc<T>, SkillFactoryError> {
    value.ok_or_else(|| SkillFactoryError::MissingCollaborator {
        skill_name: config.name.clone(),
        collaborator,
    })
}
