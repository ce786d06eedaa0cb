// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors from batch run bookkeeping and retry-one requests.
#[derive(Error, Debug, PartialEq)]
pub enum BatchError {
    #[error("batch has no generation tasks")]
    EmptyTaskList,

    #[error("duplicate task index {0} in batch")]
    DuplicateIndex(usize),

    #[error("user reference {position} is not valid base64: {reason}")]
    InvalidUserReference { position: usize, reason: String },

    #[error("invalid batch options: {0}")]
    InvalidOptions(String),

    #[error("no batch run state for run '{0}'")]
    RunNotFound(String),

    #[error("run '{run_id}' has no task with index {index}")]
    TaskNotFound { run_id: String, index: usize },
}
