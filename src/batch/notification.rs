// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    Reference,
    Batch,
}

impl BatchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchPhase::Reference => "reference",
            BatchPhase::Batch => "batch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Generating,
    Waiting,
    /// The batch phase is starting; carries no task index.
    BatchStart,
    Done,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Generating => "generating",
            TaskStatus::Waiting => "waiting",
            TaskStatus::BatchStart => "batch_start",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
        }
    }
}

/// Aggregate outcome of one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// True iff no task failed.
    pub success: bool,
    pub run_id: String,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Stored locations in completion order.
    pub artifacts: Vec<String>,
    /// Failed task indices, ascending.
    pub failed_indices: Vec<usize>,
    #[serde(default)]
    pub cancelled: bool,
}

impl BatchSummary {
    /// At least one task failed while at least one succeeded.
    pub fn is_partial_failure(&self) -> bool {
        self.failed > 0 && self.completed > 0
    }
}

/// One notification of a batch run's progress stream.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Start {
        run_id: String,
        total: usize,
    },
    Progress {
        phase: BatchPhase,
        index: Option<usize>,
        status: TaskStatus,
        current: usize,
        total: usize,
    },
    Complete {
        phase: BatchPhase,
        index: usize,
        location: String,
    },
    Error {
        phase: BatchPhase,
        index: usize,
        message: String,
        retryable: bool,
    },
    Finish(BatchSummary),
}

impl BatchEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BatchEvent::Start { .. } => "start",
            BatchEvent::Progress { .. } => "progress",
            BatchEvent::Complete { .. } => "complete",
            BatchEvent::Error { .. } => "error",
            BatchEvent::Finish(_) => "finish",
        }
    }

    pub fn status(&self) -> Option<TaskStatus> {
        match self {
            BatchEvent::Progress { status, .. } => Some(*status),
            BatchEvent::Complete { .. } => Some(TaskStatus::Done),
            BatchEvent::Error { .. } => Some(TaskStatus::Error),
            _ => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            BatchEvent::Progress { index, .. } => *index,
            BatchEvent::Complete { index, .. } | BatchEvent::Error { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let value = match self {
            BatchEvent::Start { run_id, total } => json!({ "run_id": run_id, "total": total }),
            BatchEvent::Progress {
                phase,
                index,
                status,
                current,
                total,
            } => {
                let mut data = json!({
                    "status": status.as_str(),
                    "current": current,
                    "total": total,
                    "phase": phase.as_str(),
                });
                if let (Some(index), Some(map)) = (index, data.as_object_mut()) {
                    map.insert("index".to_string(), json!(index));
                }
                data
            }
            BatchEvent::Complete {
                phase,
                index,
                location,
            } => json!({
                "index": index,
                "status": TaskStatus::Done.as_str(),
                "location": location,
                "phase": phase.as_str(),
            }),
            BatchEvent::Error {
                phase,
                index,
                message,
                retryable,
            } => json!({
                "index": index,
                "status": TaskStatus::Error.as_str(),
                "message": message,
                "retryable": retryable,
                "phase": phase.as_str(),
            }),
            BatchEvent::Finish(summary) => json!(summary),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}
