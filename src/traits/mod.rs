// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod collaborators;
pub mod skill;

pub use collaborators::{ArtifactCompressor, ArtifactGenerator, StorageSink, TextGenerator, TextOptions};
pub use skill::{
    Skill, SkillContext, SkillCore, SkillEvent, SkillNotice, SkillOptions, SkillResult, SkillStatus,
};
