// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! # Batch Generation Scheduler
//!
//! Produces one artifact per [`GenerationTask`] through a pluggable
//! [`ArtifactGenerator`], stores each one through a [`StorageSink`] and reports
//! progress as a lazily consumed stream of [`BatchEvent`]s.
//!
//! ## Two-phase protocol
//!
//! 1. **Reference phase**: the task whose category matches `reference_tag`
//!    (or the first task when none does) is generated alone. On success the
//!    artifact is compressed to `reference_max_bytes` and retained.
//! 2. **Batch phase**: the remaining tasks run either sequentially, with
//!    `request_delay_seconds` between calls, or on a bounded pool of
//!    `max_workers` tokio tasks collected in completion order. Every call gets
//!    the retained reference when one exists.
//!
//! ## Failure semantics
//!
//! A failed task is recorded in [`BatchRunRegistry`] and reported, but never
//! stops the batch. The scheduler does not retry on its own; a failed index stays
//! failed until [`BatchGenerationScheduler::retry_one`] is called for it.
//!
//! ## Cancellation
//!
//! The run's `CancellationToken` is checked before each task starts. Tasks not
//! yet started when it trips are recorded as failed with reason `cancelled`;
//! calls already in flight are left to finish.
//!
//! ```text
//! start ─▶ progress(ref) ─▶ complete|error(ref) ─▶ progress(batch_start)
//!       ─▶ [progress(i) ─▶ complete|error(i)]* ─▶ finish(summary)
//! ```

use async_stream::stream;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::notification::{BatchEvent, BatchPhase, BatchSummary, TaskStatus};
use super::options::{BatchOptions, ConcurrencyMode};
use super::state::{BatchRunRegistry, BatchRunState};
use super::task::{BatchInput, GenerationRequest, GenerationTask};
use crate::errors::{BatchError, SkillError};
use crate::observability::messages::batch::{
    BatchRunCompleted, BatchRunStarted, ReferenceOutcome, TaskGenerationFailed,
    TaskRetryRequested,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{ArtifactCompressor, ArtifactGenerator, StorageSink};

/// Failure reason recorded for tasks skipped by cancellation.
pub const CANCELLED_REASON: &str = "cancelled";

const WORKER_LOST_REASON: &str = "generation worker ended without reporting a result";

/// Result of a single-task retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryOutcome {
    pub run_id: String,
    pub index: usize,
    pub success: bool,
    pub location: Option<String>,
    pub error: Option<String>,
    pub retryable: bool,
}

struct StoredArtifact {
    location: String,
    data: Bytes,
}

struct TaskOutcome {
    index: usize,
    result: Result<StoredArtifact, String>,
}

impl TaskOutcome {
    fn failed(index: usize, reason: &str) -> Self {
        Self {
            index,
            result: Err(reason.to_string()),
        }
    }
}

/// Generates and stores one artifact. Cloned into each concurrent worker.
#[derive(Clone)]
struct ArtifactWorker {
    generator: Arc<dyn ArtifactGenerator>,
    storage: Arc<dyn StorageSink>,
    compressor: Arc<dyn ArtifactCompressor>,
    thumbnail_max_bytes: usize,
}

impl ArtifactWorker {
    /// Never panics; a panicking generator or sink becomes a failed outcome.
    async fn produce(&self, request: GenerationRequest, reference: Option<Bytes>) -> TaskOutcome {
        let index = request.index();
        let attempt = AssertUnwindSafe(self.attempt(&request, reference.as_ref()))
            .catch_unwind()
            .await;
        let result = match attempt {
            Ok(Ok(stored)) => Ok(stored),
            Ok(Err(err)) => Err(err.to_string()),
            Err(payload) => Err(SkillError::from_panic(payload).to_string()),
        };
        TaskOutcome { index, result }
    }

    async fn attempt(
        &self,
        request: &GenerationRequest,
        reference: Option<&Bytes>,
    ) -> Result<StoredArtifact, SkillError> {
        let data = self.generator.generate(request, reference).await?;
        let filename = format!("{}.{}", request.index(), self.generator.file_extension());
        let location = self.storage.save(&request.run_id, &filename, &data).await?;

        if self.thumbnail_max_bytes > 0 {
            let thumbnail = self.compressor.compress(&data, self.thumbnail_max_bytes);
            self.storage
                .save(&request.run_id, &format!("thumb_{}", filename), &thumbnail)
                .await?;
        }

        Ok(StoredArtifact { location, data })
    }
}

/// Accumulates per-task outcomes for one run and mirrors them into the registry.
struct RunTally {
    run_id: String,
    registry: Arc<BatchRunRegistry>,
    artifacts: Vec<String>,
    failed_indices: Vec<usize>,
}

impl RunTally {
    fn new(run_id: String, registry: Arc<BatchRunRegistry>) -> Self {
        Self {
            run_id,
            registry,
            artifacts: Vec::new(),
            failed_indices: Vec::new(),
        }
    }

    fn completed(&self) -> usize {
        self.artifacts.len()
    }

    fn settle(&mut self, phase: BatchPhase, outcome: TaskOutcome) -> BatchEvent {
        let index = outcome.index;
        match outcome.result {
            Ok(stored) => {
                self.registry
                    .record_success(&self.run_id, index, stored.location.clone());
                self.artifacts.push(stored.location.clone());
                BatchEvent::Complete {
                    phase,
                    index,
                    location: stored.location,
                }
            }
            Err(message) => {
                self.registry.record_failure(&self.run_id, index, message.clone());
                self.failed_indices.push(index);
                TaskGenerationFailed {
                    run_id: &self.run_id,
                    index,
                    error: &message,
                }
                .log();
                BatchEvent::Error {
                    phase,
                    index,
                    message,
                    retryable: true,
                }
            }
        }
    }

    fn finish(mut self, total: usize, cancelled: bool) -> BatchSummary {
        self.failed_indices.sort_unstable();
        BatchSummary {
            success: self.failed_indices.is_empty(),
            run_id: self.run_id,
            total,
            completed: self.artifacts.len(),
            failed: self.failed_indices.len(),
            artifacts: self.artifacts,
            failed_indices: self.failed_indices,
            cancelled,
        }
    }
}

/// Split off the reference task: the first tagged `reference_tag`, else the first task.
fn split_reference(
    tasks: &[GenerationTask],
    reference_tag: &str,
) -> Option<(GenerationTask, Vec<GenerationTask>)> {
    if tasks.is_empty() {
        return None;
    }
    let position = tasks
        .iter()
        .position(|t| t.category == reference_tag)
        .unwrap_or(0);
    let mut remaining = tasks.to_vec();
    let reference = remaining.remove(position);
    Some((reference, remaining))
}

fn new_run_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("task_{}", &id[..8])
}

pub struct BatchGenerationScheduler {
    worker: ArtifactWorker,
    registry: Arc<BatchRunRegistry>,
    options: BatchOptions,
}

impl BatchGenerationScheduler {
    pub fn new(
        generator: Arc<dyn ArtifactGenerator>,
        storage: Arc<dyn StorageSink>,
        compressor: Arc<dyn ArtifactCompressor>,
        options: BatchOptions,
    ) -> Self {
        Self {
            worker: ArtifactWorker {
                generator,
                storage,
                compressor,
                thumbnail_max_bytes: options.thumbnail_max_bytes,
            },
            registry: Arc::new(BatchRunRegistry::new()),
            options,
        }
    }

    /// Share a registry with other schedulers or with the host.
    pub fn with_registry(mut self, registry: Arc<BatchRunRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<BatchRunRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub fn task_state(&self, run_id: &str) -> Option<BatchRunState> {
        self.registry.snapshot(run_id)
    }

    pub fn dispose(&self, run_id: &str) -> bool {
        self.registry.dispose(run_id)
    }

    /// Validate the input, register the run, and return its progress stream.
    ///
    /// Nothing is generated until the stream is polled. The stream always ends
    /// with exactly one [`BatchEvent::Finish`].
    pub fn run(
        &self,
        input: BatchInput,
        cancel: CancellationToken,
    ) -> Result<BoxStream<'static, BatchEvent>, BatchError> {
        self.options.validate()?;
        input.validate()?;
        let user_references: Vec<Bytes> = input
            .decode_user_references()?
            .iter()
            .map(|r| self.worker.compressor.compress(r, self.options.reference_max_bytes))
            .collect();
        let (reference_task, remaining) =
            split_reference(&input.tasks, &self.options.reference_tag)
                .ok_or(BatchError::EmptyTaskList)?;

        let run_id = input.run_id.clone().unwrap_or_else(new_run_id);
        let mut state = BatchRunState::new(run_id.clone(), input.tasks);
        state.reference_index = Some(reference_task.index);
        state.outline = input.outline;
        state.topic = input.topic;
        state.user_references = user_references;
        let template = state.clone();
        self.registry.begin(state);

        let worker = self.worker.clone();
        let registry = Arc::clone(&self.registry);
        let options = self.options.clone();
        let total = template.tasks.len();

        let events = stream! {
            let started = Instant::now();
            BatchRunStarted {
                run_id: &run_id,
                total,
                mode: options.concurrency_mode.as_str(),
            }
            .log();
            yield BatchEvent::Start { run_id: run_id.clone(), total };

            let mut tally = RunTally::new(run_id.clone(), Arc::clone(&registry));
            let delay = options.request_delay();
            let mut reference: Option<Bytes> = None;
            let reference_index = reference_task.index;

            if cancel.is_cancelled() {
                yield tally.settle(BatchPhase::Reference, TaskOutcome::failed(reference_index, CANCELLED_REASON));
            } else {
                yield BatchEvent::Progress {
                    phase: BatchPhase::Reference,
                    index: Some(reference_index),
                    status: TaskStatus::Generating,
                    current: 1,
                    total,
                };
                let outcome = worker.produce(template.request_for(reference_task), None).await;
                if let Ok(stored) = &outcome.result {
                    let compressed = worker.compressor.compress(&stored.data, options.reference_max_bytes);
                    registry.set_reference(&run_id, Some(compressed.clone()));
                    reference = Some(compressed);
                }
                ReferenceOutcome {
                    run_id: &run_id,
                    index: reference_index,
                    error: outcome.result.as_ref().err().map(String::as_str),
                }
                .log();
                let succeeded = outcome.result.is_ok();
                yield tally.settle(BatchPhase::Reference, outcome);

                if succeeded && !delay.is_zero() && !remaining.is_empty() {
                    yield BatchEvent::Progress {
                        phase: BatchPhase::Reference,
                        index: None,
                        status: TaskStatus::Waiting,
                        current: tally.completed(),
                        total,
                    };
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {}
                    }
                }
            }

            if !remaining.is_empty() {
                yield BatchEvent::Progress {
                    phase: BatchPhase::Batch,
                    index: None,
                    status: TaskStatus::BatchStart,
                    current: tally.completed(),
                    total,
                };

                match options.concurrency_mode {
                    ConcurrencyMode::Sequential => {
                        for (position, task) in remaining.into_iter().enumerate() {
                            let index = task.index;
                            if position > 0 && !delay.is_zero() && !cancel.is_cancelled() {
                                yield BatchEvent::Progress {
                                    phase: BatchPhase::Batch,
                                    index: Some(index),
                                    status: TaskStatus::Waiting,
                                    current: tally.completed(),
                                    total,
                                };
                                tokio::select! {
                                    _ = tokio::time::sleep(delay) => {}
                                    _ = cancel.cancelled() => {}
                                }
                            }
                            if cancel.is_cancelled() {
                                yield tally.settle(BatchPhase::Batch, TaskOutcome::failed(index, CANCELLED_REASON));
                                continue;
                            }

                            yield BatchEvent::Progress {
                                phase: BatchPhase::Batch,
                                index: Some(index),
                                status: TaskStatus::Generating,
                                current: tally.completed() + 1,
                                total,
                            };
                            let outcome = worker.produce(template.request_for(task), reference.clone()).await;
                            yield tally.settle(BatchPhase::Batch, outcome);
                        }
                    }
                    ConcurrencyMode::BoundedConcurrent => {
                        let semaphore = Arc::new(Semaphore::new(options.max_workers.max(1)));
                        let mut pending = BTreeSet::new();
                        let mut workers = JoinSet::new();

                        for task in remaining {
                            let index = task.index;
                            pending.insert(index);
                            let request = template.request_for(task);
                            let worker = worker.clone();
                            let semaphore = Arc::clone(&semaphore);
                            let cancel = cancel.clone();
                            let reference = reference.clone();

                            workers.spawn(async move {
                                let _permit = semaphore.acquire_owned().await;
                                if cancel.is_cancelled() {
                                    return TaskOutcome::failed(index, CANCELLED_REASON);
                                }
                                worker.produce(request, reference).await
                            });
                        }

                        while let Some(joined) = workers.join_next().await {
                            if let Ok(outcome) = joined {
                                pending.remove(&outcome.index);
                                yield tally.settle(BatchPhase::Batch, outcome);
                            }
                        }
                        for index in pending {
                            yield tally.settle(BatchPhase::Batch, TaskOutcome::failed(index, WORKER_LOST_REASON));
                        }
                    }
                }
            }

            let summary = tally.finish(total, cancel.is_cancelled());
            BatchRunCompleted {
                run_id: &run_id,
                completed: summary.completed,
                failed: summary.failed,
                duration: started.elapsed(),
            }
            .log();
            yield BatchEvent::Finish(summary);
        };

        Ok(events.boxed())
    }

    /// Regenerate exactly one task of an earlier run.
    ///
    /// Reuses the run's retained reference (when `use_reference` is set) and its
    /// outline, topic and user references. On success the index moves from the
    /// failure map to the generated map; no other index is touched.
    pub async fn retry_one(
        &self,
        run_id: &str,
        index: usize,
        use_reference: bool,
    ) -> Result<RetryOutcome, BatchError> {
        let state = self
            .registry
            .snapshot(run_id)
            .ok_or_else(|| BatchError::RunNotFound(run_id.to_string()))?;
        let task = state
            .task(index)
            .cloned()
            .ok_or_else(|| BatchError::TaskNotFound {
                run_id: run_id.to_string(),
                index,
            })?;

        TaskRetryRequested {
            run_id,
            index,
            use_reference,
        }
        .log();

        let is_reference_task = state.reference_index == Some(index);
        let reference = if use_reference && !is_reference_task {
            state.reference.clone()
        } else {
            None
        };

        let outcome = self.worker.produce(state.request_for(task), reference).await;
        match outcome.result {
            Ok(stored) => {
                self.registry
                    .record_success(run_id, index, stored.location.clone());
                if is_reference_task && state.reference.is_none() {
                    let compressed = self
                        .worker
                        .compressor
                        .compress(&stored.data, self.options.reference_max_bytes);
                    self.registry.set_reference(run_id, Some(compressed));
                }
                Ok(RetryOutcome {
                    run_id: run_id.to_string(),
                    index,
                    success: true,
                    location: Some(stored.location),
                    error: None,
                    retryable: false,
                })
            }
            Err(message) => {
                self.registry.record_failure(run_id, index, message.clone());
                TaskGenerationFailed {
                    run_id,
                    index,
                    error: &message,
                }
                .log();
                Ok(RetryOutcome {
                    run_id: run_id.to_string(),
                    index,
                    success: false,
                    location: None,
                    error: Some(message),
                    retryable: true,
                })
            }
        }
    }
}
