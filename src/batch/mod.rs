// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Batch artifact generation: tasks, run state, progress notifications and the scheduler.

pub mod notification;
pub mod options;
pub mod scheduler;
pub mod state;
pub mod task;

pub use notification::{BatchEvent, BatchPhase, BatchSummary, TaskStatus};
pub use options::{BatchOptions, ConcurrencyMode};
pub use scheduler::{BatchGenerationScheduler, RetryOutcome, CANCELLED_REASON};
pub use state::{BatchRunRegistry, BatchRunState};
pub use task::{decode_base64_artifact, BatchInput, GenerationRequest, GenerationTask};
