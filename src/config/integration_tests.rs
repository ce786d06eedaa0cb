// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use std::io::Write;
    use std::sync::Arc;

    use serde_json::{json, Map};
    use tempfile::{NamedTempFile, TempDir};

    use crate::backends::local::InMemoryStorage;
    use crate::config::{
        load_and_validate_config, BackendType, Collaborators, RuntimeBuilder, StorageType,
    };
    use crate::engine::PipelineStatus;
    use crate::errors::ConfigError;

    const DEMO: &str = "configs/local-demo.yaml";

    /// The shipped demo configuration loads and validates.
    #[test]
    fn test_demo_yaml_loading() {
        let config = load_and_validate_config(DEMO).unwrap();

        assert_eq!(config.name, "storyboard");
        assert_eq!(config.skills.len(), 3);
        assert_eq!(config.skills[0].kind, "outline");
        assert_eq!(config.skills[1].kind, "content");
        assert_eq!(config.skills[2].kind, "generate_artifacts");
        assert_eq!(config.skills[2].options["max_workers"], json!(4));
        assert_eq!(config.backends.text.backend, BackendType::Local);
        assert_eq!(config.backends.text.implementation.as_deref(), Some("echo_text"));
        assert_eq!(config.backends.storage.storage, StorageType::Filesystem);
    }

    /// The demo runs end to end offline: outline, post copy, then one artifact per page.
    #[tokio::test]
    async fn test_demo_pipeline_runs_with_memory_storage() {
        let mut config = load_and_validate_config(DEMO).unwrap();
        config.backends.storage.storage = StorageType::Memory;

        let pipeline = RuntimeBuilder::from_config(&config).unwrap();
        let outcome = pipeline.run(json!({"topic": "tide pools"}), Map::new()).await;

        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(pipeline.status(), PipelineStatus::Success);
        assert_eq!(outcome.data["total"], 4);
        assert_eq!(outcome.data["completed"], 4);
        assert_eq!(outcome.data["run_id"], json!(outcome.run_id));

        let copy = outcome
            .events
            .iter()
            .find(|e| e.kind.as_str() == "step_complete" && e.skill.as_deref() == Some("content"))
            .and_then(|e| e.result.as_ref())
            .unwrap();
        assert_eq!(copy["data"]["titles"].as_array().unwrap().len(), 2);
        assert_eq!(copy["data"]["tags"][0], "tidepools");

        let artifacts = outcome.data["artifacts"].as_array().unwrap();
        assert!(artifacts
            .iter()
            .all(|location| location.as_str().unwrap().starts_with("memory://")));
    }

    /// Filesystem storage writes every artifact under `<root>/<run_id>/`.
    #[tokio::test]
    async fn test_filesystem_storage_from_config() {
        let root = TempDir::new().unwrap();
        let mut config = load_and_validate_config(DEMO).unwrap();
        config.backends.storage.root = root.path().to_path_buf();

        let pipeline = RuntimeBuilder::from_config(&config).unwrap();
        let outcome = pipeline.run(json!("tide pools"), Map::new()).await;

        assert!(outcome.success, "{:?}", outcome.error);
        let run_dir = root.path().join(&outcome.run_id);
        let stored = std::fs::read_dir(&run_dir).unwrap().count();
        assert!(stored >= 4, "expected artifacts in {:?}, found {}", run_dir, stored);
    }

    /// Injected collaborators replace the configured ones.
    #[tokio::test]
    async fn test_injected_storage_receives_artifacts() {
        let config = load_and_validate_config(DEMO).unwrap();
        let storage = Arc::new(InMemoryStorage::new());
        let collaborators = Collaborators::from_backends(&config.backends)
            .unwrap()
            .with_storage(storage.clone());

        let pipeline = RuntimeBuilder::with_collaborators(&config, &collaborators).unwrap();
        let outcome = pipeline.run(json!("tide pools"), Map::new()).await;

        assert!(outcome.success);
        assert!(storage.len() >= 4);
    }

    /// Invalid documents report every problem at once.
    #[test]
    fn test_invalid_yaml_reports_all_errors() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "name: broken\nskills:\n  - {{name: a, kind: outline}}\n  - {{name: a, kind: sketch}}\n"
        )
        .unwrap();

        match load_and_validate_config(file.path()) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                let rendered = ConfigError::Validation(errors).to_string();
                assert!(rendered.contains("Duplicate skill name: 'a'"));
                assert!(rendered.contains("sketch"));
            }
            other => panic!("expected validation errors, got {:?}", other.map(|c| c.name)),
        }
    }
}
