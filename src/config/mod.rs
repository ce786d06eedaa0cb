// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod registry;
mod runtime;
mod validation;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, parse_config, BackendConfig, BackendType,
    BackendsConfig, PipelineConfig, SkillConfig, StorageConfig, StorageType,
};
pub use registry::SkillFactory;
pub use runtime::{Collaborators, RuntimeBuilder};
pub use validation::validate_pipeline_config;
