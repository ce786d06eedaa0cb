// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod batch;
mod config;
mod generation;
mod skill;
mod skill_factory;

pub use batch::BatchError;
pub use config::{ConfigError, ValidationError};
pub use generation::{GenerationError, StorageError};
pub(crate) use skill::panic_message;
pub use skill::SkillError;
pub use skill_factory::SkillFactoryError;
