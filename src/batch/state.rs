// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-run batch bookkeeping.
//!
//! A run's state is created when the run starts, grows as tasks settle, and
//! stays until the caller disposes of it or evicts it by age. Retry-one reads
//! the retained reference and run context from here.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::task::{GenerationRequest, GenerationTask};
use crate::observability::messages::batch::RunStateReleased;
use crate::observability::messages::StructuredLog;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchRunState {
    pub run_id: String,
    pub tasks: Vec<GenerationTask>,
    /// Index of the task generated first as the reference.
    pub reference_index: Option<usize>,
    /// Index to stored artifact location.
    pub generated: BTreeMap<usize, String>,
    /// Index to failure reason.
    pub failed: BTreeMap<usize, String>,
    /// Compressed reference artifact, when the reference task succeeded.
    pub reference: Option<Bytes>,
    pub outline: String,
    pub topic: String,
    pub user_references: Vec<Bytes>,
    pub created_at: DateTime<Utc>,
}

impl BatchRunState {
    pub fn new(run_id: impl Into<String>, tasks: Vec<GenerationTask>) -> Self {
        Self {
            run_id: run_id.into(),
            tasks,
            reference_index: None,
            generated: BTreeMap::new(),
            failed: BTreeMap::new(),
            reference: None,
            outline: String::new(),
            topic: String::new(),
            user_references: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn task(&self, index: usize) -> Option<&GenerationTask> {
        self.tasks.iter().find(|t| t.index == index)
    }

    pub fn request_for(&self, task: GenerationTask) -> GenerationRequest {
        GenerationRequest {
            run_id: self.run_id.clone(),
            task,
            outline: self.outline.clone(),
            topic: self.topic.clone(),
            user_references: self.user_references.clone(),
        }
    }

    /// Every task has settled one way or the other.
    pub fn is_settled(&self) -> bool {
        self.generated.len() + self.failed.len() == self.tasks.len()
    }
}

/// Registry of batch run states keyed by run id.
#[derive(Debug, Default)]
pub struct BatchRunRegistry {
    runs: RwLock<HashMap<String, BatchRunState>>,
}

impl BatchRunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run, replacing any earlier state under the same id.
    pub fn begin(&self, state: BatchRunState) {
        self.runs.write().insert(state.run_id.clone(), state);
    }

    pub fn snapshot(&self, run_id: &str) -> Option<BatchRunState> {
        self.runs.read().get(run_id).cloned()
    }

    pub fn contains(&self, run_id: &str) -> bool {
        self.runs.read().contains_key(run_id)
    }

    /// Mark an index generated, clearing any earlier failure for it.
    pub fn record_success(&self, run_id: &str, index: usize, location: impl Into<String>) {
        if let Some(state) = self.runs.write().get_mut(run_id) {
            state.failed.remove(&index);
            state.generated.insert(index, location.into());
        }
    }

    /// Mark an index failed. An index that already has an artifact keeps it.
    pub fn record_failure(&self, run_id: &str, index: usize, reason: impl Into<String>) {
        if let Some(state) = self.runs.write().get_mut(run_id) {
            if !state.generated.contains_key(&index) {
                state.failed.insert(index, reason.into());
            }
        }
    }

    pub fn set_reference(&self, run_id: &str, reference: Option<Bytes>) {
        if let Some(state) = self.runs.write().get_mut(run_id) {
            state.reference = reference;
        }
    }

    /// Drop a run's state. Returns whether it existed.
    pub fn dispose(&self, run_id: &str) -> bool {
        let removed = self.runs.write().remove(run_id).is_some();
        if removed {
            RunStateReleased {
                run_id,
                reason: "disposed",
            }
            .log();
        }
        removed
    }

    /// Drop every run created more than `ttl` ago. Returns how many were dropped.
    pub fn evict_older_than(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let now = Utc::now();
        let mut runs = self.runs.write();
        let expired: Vec<String> = runs
            .values()
            .filter(|state| now.signed_duration_since(state.created_at) > ttl)
            .map(|state| state.run_id.clone())
            .collect();
        for run_id in &expired {
            runs.remove(run_id);
            RunStateReleased {
                run_id,
                reason: "expired",
            }
            .log();
        }
        expired.len()
    }

    pub fn run_ids(&self) -> Vec<String> {
        self.runs.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.runs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.read().is_empty()
    }
}
