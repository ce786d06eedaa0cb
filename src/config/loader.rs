// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::consts::DEFAULT_STORAGE_ROOT;
use crate::errors::ConfigError;
use crate::observability::messages::validation::UnresolvedPlaceholder;
use crate::observability::messages::StructuredLog;

/// Top-level configuration for one pipeline.
///
/// This struct is loaded from a YAML document and describes the ordered skills
/// of a single linear workflow, the collaborator backends those skills use, and
/// any variables seeded into every run context.
///
/// # Fields
/// * `name` - Pipeline name, used in events and logs
/// * `description` - Free-form description (optional)
/// * `variables` - Values merged into each run's context (optional)
/// * `backends` - Text, artifact and storage collaborators (optional, all local)
/// * `skills` - Ordered skill definitions; step numbers follow this order
///
/// # Example
/// ```yaml
/// name: storyboard
/// description: Outline a topic and render one artifact per page
/// backends:
///   text: { type: local }
///   artifact: { type: local, options: { width: 768, height: 1024 } }
///   storage: { type: filesystem, root: history }
/// skills:
///   - name: outline
///     kind: outline
///   - name: generate_artifacts
///     kind: generate_artifacts
///     options:
///       concurrency_mode: sequential
///       request_delay_seconds: 0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(default)]
    pub backends: BackendsConfig,
    pub skills: Vec<SkillConfig>,
}

/// Configuration for a single skill in the pipeline.
///
/// `kind` selects the implementation through the skill factory; `options` are
/// handed to the skill untouched and validated lazily by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillConfig {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Collaborator backends shared by every skill of a pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendsConfig {
    #[serde(default)]
    pub text: BackendConfig,
    #[serde(default)]
    pub artifact: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// One generation backend.
///
/// # Fields
/// * `backend` - Where the implementation lives (`type` in YAML)
/// * `implementation` - Named local implementation (optional, role default otherwise)
/// * `endpoint` - Network endpoint for remote backends
/// * `options` - Implementation-specific settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(rename = "type", default)]
    pub backend: BackendType,
    #[serde(default)]
    pub implementation: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Backend implementation type for generation collaborators.
///
/// # Variants
/// * `Local` - In-process implementation shipped with this crate
/// * `Http` - HTTP-based remote service, supplied by the host application
/// * `Grpc` - Remote procedure call over gRPC, supplied by the host application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    #[default]
    Local,
    Http,
    Grpc,
}

/// Where generated artifacts are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type", default)]
    pub storage: StorageType,
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage: StorageType::default(),
            root: default_storage_root(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_ROOT)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    #[default]
    Filesystem,
    Memory,
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern"));

fn resolve_placeholders(text: &str) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| match std::env::var(&caps[1]) {
            Ok(value) => value,
            Err(_) => {
                UnresolvedPlaceholder { variable: &caps[1] }.log();
                String::new()
            }
        })
        .into_owned()
}

fn resolve_value(value: &mut serde_yaml::Value) {
    match value {
        serde_yaml::Value::String(s) => {
            if s.contains("${") {
                *s = resolve_placeholders(s);
            }
        }
        serde_yaml::Value::Sequence(items) => items.iter_mut().for_each(resolve_value),
        serde_yaml::Value::Mapping(map) => map.values_mut().for_each(resolve_value),
        serde_yaml::Value::Tagged(tagged) => resolve_value(&mut tagged.value),
        _ => {}
    }
}

/// Parse a pipeline document, resolving `${VAR}` placeholders in string values
/// from the environment first.
pub fn parse_config(content: &str) -> Result<PipelineConfig, ConfigError> {
    let mut document: serde_yaml::Value = serde_yaml::from_str(content)?;
    resolve_value(&mut document);
    Ok(serde_yaml::from_value(document)?)
}

/// Load a config from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load and validate a config from a YAML file
///
/// Every validation problem is reported at once in `ConfigError::Validation`.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_pipeline_config(&cfg).map_err(ConfigError::Validation)?;
    Ok(cfg)
}
