// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::BatchError;

fn default_category() -> String {
    "content".to_string()
}

/// Decode a base64 artifact, accepting an optional `data:<mime>;base64,` prefix.
pub fn decode_base64_artifact(encoded: &str) -> Result<Bytes, base64::DecodeError> {
    let payload = match encoded.split_once("base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    STANDARD.decode(payload.trim()).map(Bytes::from)
}

/// One unit of work producing one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTask {
    /// Stable ordinal within the batch.
    pub index: usize,
    #[serde(alias = "type", default = "default_category")]
    pub category: String,
    /// Textual generation spec handed to the generator.
    #[serde(alias = "content", default)]
    pub spec: String,
}

impl GenerationTask {
    pub fn new(index: usize, category: impl Into<String>, spec: impl Into<String>) -> Self {
        Self {
            index,
            category: category.into(),
            spec: spec.into(),
        }
    }
}

/// Input of one batch run, as produced by the outline step or supplied by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchInput {
    #[serde(alias = "pages")]
    pub tasks: Vec<GenerationTask>,
    /// Caller-chosen run id; generated when absent.
    #[serde(default, alias = "task_id")]
    pub run_id: Option<String>,
    /// Full outline text, shared context for every task.
    #[serde(default, alias = "full_outline", alias = "raw")]
    pub outline: String,
    #[serde(default, alias = "user_topic")]
    pub topic: String,
    /// Base64 artifacts supplied by the user, optionally as `data:` URLs.
    #[serde(default, alias = "user_images")]
    pub user_references: Vec<String>,
}

impl BatchInput {
    pub fn new(tasks: Vec<GenerationTask>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Reject an empty task list or repeated indices.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.tasks.is_empty() {
            return Err(BatchError::EmptyTaskList);
        }
        let mut seen = HashSet::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if !seen.insert(task.index) {
                return Err(BatchError::DuplicateIndex(task.index));
            }
        }
        Ok(())
    }

    pub fn decode_user_references(&self) -> Result<Vec<Bytes>, BatchError> {
        self.user_references
            .iter()
            .enumerate()
            .map(|(position, encoded)| {
                decode_base64_artifact(encoded).map_err(|e| BatchError::InvalidUserReference {
                    position,
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

/// Everything a generator needs to produce one task's artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub run_id: String,
    pub task: GenerationTask,
    pub outline: String,
    pub topic: String,
    pub user_references: Vec<Bytes>,
}

impl GenerationRequest {
    pub fn index(&self) -> usize {
        self.task.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_accepts_outline_shaped_json() {
        let input: BatchInput = serde_json::from_value(json!({
            "pages": [
                {"index": 0, "type": "cover", "content": "Title page"},
                {"index": 1, "content": "Body"}
            ],
            "task_id": "run-7",
            "full_outline": "whole outline",
            "user_topic": "tea"
        }))
        .unwrap();

        assert_eq!(input.tasks[0].category, "cover");
        assert_eq!(input.tasks[1].category, "content");
        assert_eq!(input.tasks[1].spec, "Body");
        assert_eq!(input.run_id.as_deref(), Some("run-7"));
        assert_eq!(input.outline, "whole outline");
        assert_eq!(input.topic, "tea");
    }

    #[test]
    fn test_validate_rejects_empty_and_duplicates() {
        assert_eq!(BatchInput::default().validate(), Err(BatchError::EmptyTaskList));

        let input = BatchInput::new(vec![
            GenerationTask::new(1, "cover", "a"),
            GenerationTask::new(1, "content", "b"),
        ]);
        assert_eq!(input.validate(), Err(BatchError::DuplicateIndex(1)));
    }

    #[test]
    fn test_decode_user_references() {
        let mut input = BatchInput::new(vec![GenerationTask::new(0, "cover", "a")]);
        input.user_references = vec![
            "aGVsbG8=".to_string(),
            "data:image/png;base64,d29ybGQ=".to_string(),
        ];
        let decoded = input.decode_user_references().unwrap();
        assert_eq!(decoded, vec![Bytes::from("hello"), Bytes::from("world")]);

        input.user_references.push("not base64!".to_string());
        assert!(matches!(
            input.decode_user_references(),
            Err(BatchError::InvalidUserReference { position: 2, .. })
        ));
    }
}
