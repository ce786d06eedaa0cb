// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crate::batch::{
    BatchEvent, BatchGenerationScheduler, BatchInput, BatchOptions, BatchRunRegistry,
    BatchSummary, RetryOutcome,
};
use crate::errors::{BatchError, SkillError};
use crate::traits::skill::{begin_execution, conclude_execution};
use crate::traits::{
    ArtifactCompressor, ArtifactGenerator, Skill, SkillContext, SkillCore, SkillEvent,
    SkillNotice, SkillOptions, SkillResult, StorageSink,
};

/// The batch generation scheduler exposed as a pipeline step.
///
/// Input is a [`BatchInput`] (the outline skill's output fits as is). When the
/// input names no run id, the pipeline run id is used so the host can retry
/// single tasks against it later. Batch options are read from the skill
/// options on every execution.
///
/// Progress is relayed as `artifact_start`, `artifact_progress`,
/// `artifact_complete` and `artifact_error` notices. The result data is the
/// [`BatchSummary`]. A partial failure fails the step unless
/// `tolerate_partial_failure` is set and at least one artifact was produced.
pub struct BatchGenerationSkill {
    core: SkillCore,
    generator: Arc<dyn ArtifactGenerator>,
    storage: Arc<dyn StorageSink>,
    compressor: Arc<dyn ArtifactCompressor>,
    registry: Arc<BatchRunRegistry>,
}

impl BatchGenerationSkill {
    pub const KIND: &'static str = "generate_artifacts";

    pub fn new(
        name: impl Into<String>,
        options: SkillOptions,
        generator: Arc<dyn ArtifactGenerator>,
        storage: Arc<dyn StorageSink>,
        compressor: Arc<dyn ArtifactCompressor>,
    ) -> Self {
        Self {
            core: SkillCore::new(name, "1.0.0")
                .with_description("Generate one artifact per task")
                .with_options(options),
            generator,
            storage,
            compressor,
            registry: Arc::new(BatchRunRegistry::new()),
        }
    }

    pub fn with_registry(mut self, registry: Arc<BatchRunRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Run state of every batch this skill started and nobody disposed.
    pub fn registry(&self) -> &Arc<BatchRunRegistry> {
        &self.registry
    }

    pub fn scheduler(&self) -> Result<BatchGenerationScheduler, BatchError> {
        let options = BatchOptions::from_options(self.core.options())?;
        Ok(BatchGenerationScheduler::new(
            Arc::clone(&self.generator),
            Arc::clone(&self.storage),
            Arc::clone(&self.compressor),
            options,
        )
        .with_registry(Arc::clone(&self.registry)))
    }

    /// Regenerate one task of an earlier run.
    pub async fn retry_one(
        &self,
        run_id: &str,
        index: usize,
        use_reference: bool,
    ) -> Result<RetryOutcome, BatchError> {
        self.scheduler()?.retry_one(run_id, index, use_reference).await
    }

    fn tolerates_partial_failure(&self) -> bool {
        self.core
            .options()
            .get("tolerate_partial_failure")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn start_batch(
        &self,
        input: Value,
        context: &SkillContext,
    ) -> Result<BoxStream<'static, BatchEvent>, SkillError> {
        if context.is_cancelled() {
            return Err(SkillError::Cancelled);
        }
        let mut input: BatchInput = serde_json::from_value(input)
            .map_err(|e| SkillError::InvalidInput(format!("not a batch input: {}", e)))?;
        if input.run_id.is_none() {
            input.run_id = context.run_id().map(str::to_string);
        }
        let events = self
            .scheduler()?
            .run(input, context.cancellation().clone())?;
        Ok(events)
    }

    fn summarize(&self, summary: BatchSummary) -> Result<SkillResult, SkillError> {
        let succeeded = summary.success
            || (self.tolerates_partial_failure() && summary.completed > 0 && !summary.cancelled);
        let error = if succeeded {
            None
        } else if summary.cancelled {
            Some(format!(
                "batch {} cancelled after {} of {} artifacts",
                summary.run_id, summary.completed, summary.total
            ))
        } else {
            Some(format!(
                "batch {} produced {} of {} artifacts; failed indices {:?}",
                summary.run_id, summary.completed, summary.total, summary.failed_indices
            ))
        };

        let data = serde_json::to_value(&summary)
            .map_err(|e| SkillError::InvalidInput(format!("unserializable summary: {}", e)))?;
        Ok(SkillResult {
            success: succeeded,
            data,
            error,
            metadata: Map::new(),
        }
        .with_metadata("skill", self.name())
        .with_metadata("run_id", summary.run_id.as_str())
        .with_metadata("completed", summary.completed)
        .with_metadata("failed", summary.failed))
    }
}

/// Relay form of a batch event. `settled` counts tasks finished so far.
fn notice_for(event: &BatchEvent, settled: usize, total: usize) -> SkillNotice {
    let error = match event {
        BatchEvent::Error { message, .. } => Some(message.clone()),
        _ => None,
    };
    SkillNotice {
        event: format!("artifact_{}", event.name()),
        error,
        data: event.to_json(),
        progress: Some(settled as f64 / total.max(1) as f64),
    }
}

async fn drain_summary(
    mut events: BoxStream<'static, BatchEvent>,
) -> Result<BatchSummary, SkillError> {
    let mut summary = None;
    while let Some(event) = events.next().await {
        if let BatchEvent::Finish(finished) = event {
            summary = Some(finished);
        }
    }
    summary.ok_or_else(|| SkillError::Panicked("batch stream ended without a summary".into()))
}

#[async_trait]
impl Skill for BatchGenerationSkill {
    fn core(&self) -> &SkillCore {
        &self.core
    }

    async fn run(&self, input: Value, context: &SkillContext) -> Result<SkillResult, SkillError> {
        let events = self.start_batch(input, context)?;
        let summary = drain_summary(events).await?;
        self.summarize(summary)
    }

    fn execute_stream<'a>(
        &'a self,
        input: Value,
        context: &'a SkillContext,
    ) -> BoxStream<'a, SkillEvent> {
        let events = stream! {
            let span = begin_execution(&self.core, context);
            let started = Instant::now();
            let prepared = {
                let _entered = span.enter();
                catch_unwind(AssertUnwindSafe(|| {
                    self.pre_run(input, context)
                        .and_then(|input| self.start_batch(input, context))
                }))
                .unwrap_or_else(|payload| Err(SkillError::from_panic(payload)))
            };

            let outcome = match prepared {
                Err(err) => Err(err),
                Ok(mut batch) => {
                    let mut summary = None;
                    let mut fault = None;
                    let (mut settled, mut total) = (0, 0);
                    loop {
                        match AssertUnwindSafe(batch.next()).catch_unwind().await {
                            Ok(Some(BatchEvent::Finish(finished))) => summary = Some(finished),
                            Ok(Some(other)) => {
                                match &other {
                                    BatchEvent::Start { total: tasks, .. } => total = *tasks,
                                    BatchEvent::Complete { .. } | BatchEvent::Error { .. } => settled += 1,
                                    _ => {}
                                }
                                yield SkillEvent::Notice(notice_for(&other, settled, total));
                            }
                            Ok(None) => break,
                            Err(payload) => {
                                fault = Some(SkillError::from_panic(payload));
                                break;
                            }
                        }
                    }
                    match fault {
                        Some(err) => Err(err),
                        None => summary
                            .ok_or_else(|| SkillError::Panicked("batch stream ended without a summary".into()))
                            .and_then(|summary| self.summarize(summary))
                            .and_then(|result| {
                                catch_unwind(AssertUnwindSafe(|| self.post_run(result, context)))
                                    .map_err(SkillError::from_panic)
                            }),
                    }
                }
            };

            yield SkillEvent::Finished(conclude_execution(&self.core, outcome, context, started));
        };
        events.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::InMemoryStorage;
    use crate::backends::stub::{MarkingCompressor, RecordingGenerator};
    use crate::traits::SkillStatus;
    use bytes::Bytes;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn skill_with(generator: Arc<RecordingGenerator>, options: Value) -> BatchGenerationSkill {
        BatchGenerationSkill::new(
            "generate_artifacts",
            options.as_object().cloned().unwrap_or_default(),
            generator,
            Arc::new(InMemoryStorage::new()),
            Arc::new(MarkingCompressor),
        )
    }

    fn pages(count: usize) -> Value {
        let pages: Vec<Value> = (0..count)
            .map(|i| {
                json!({
                    "index": i,
                    "type": if i == 0 { "cover" } else { "content" },
                    "content": format!("page {}", i),
                })
            })
            .collect();
        json!({ "pages": pages, "topic": "otters" })
    }

    fn context(run_id: &str) -> SkillContext {
        let mut variables = Map::new();
        variables.insert("run_id".into(), json!(run_id));
        variables.insert("step".into(), json!(2));
        SkillContext::new(variables)
    }

    #[tokio::test]
    async fn test_stream_relays_batch_notices() {
        let generator = Arc::new(RecordingGenerator::new());
        let skill = skill_with(generator, json!({"request_delay_seconds": 0}));
        let ctx = context("run-a");

        let events: Vec<SkillEvent> = skill.execute_stream(pages(2), &ctx).collect().await;

        let names: Vec<String> = events
            .iter()
            .map(|e| match e {
                SkillEvent::Notice(n) => n.event.clone(),
                SkillEvent::Finished(_) => "finished".to_string(),
            })
            .collect();
        assert_eq!(
            names,
            vec![
                "artifact_start",
                "artifact_progress",
                "artifact_complete",
                "artifact_progress",
                "artifact_progress",
                "artifact_complete",
                "finished",
            ]
        );
        let fractions: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                SkillEvent::Notice(n) => n.progress,
                SkillEvent::Finished(_) => None,
            })
            .collect();
        assert_eq!(fractions, vec![0.0, 0.0, 0.5, 0.5, 0.5, 1.0]);

        match events.last() {
            Some(SkillEvent::Finished(result)) => {
                assert!(result.success);
                assert_eq!(result.data["run_id"], "run-a");
                assert_eq!(result.data["completed"], 2);
            }
            other => panic!("unexpected tail {:?}", other),
        }
        assert_eq!(skill.status(), SkillStatus::Success);
        assert!(skill.registry().contains("run-a"));
    }

    #[tokio::test]
    async fn test_partial_failure_fails_the_step_by_default() {
        let generator = Arc::new(RecordingGenerator::new());
        generator.fail_on(&[2]);
        let skill = skill_with(generator, json!({"request_delay_seconds": 0}));

        let result = skill.execute(pages(3), &context("run-b")).await;

        assert!(!result.success);
        assert_eq!(result.data["failed_indices"], json!([2]));
        assert!(result.error.unwrap().contains("produced 2 of 3 artifacts"));
        assert_eq!(skill.status(), SkillStatus::Failed);
    }

    #[tokio::test]
    async fn test_partial_failure_can_be_tolerated() {
        let generator = Arc::new(RecordingGenerator::new());
        generator.fail_on(&[2]);
        let skill = skill_with(
            generator,
            json!({"request_delay_seconds": 0, "tolerate_partial_failure": true}),
        );

        let result = skill.execute(pages(3), &context("run-c")).await;

        assert!(result.success);
        assert_eq!(result.data["success"], false);
        assert_eq!(result.metadata["failed"], 1);
    }

    #[tokio::test]
    async fn test_retry_one_through_the_skill() {
        let generator = Arc::new(RecordingGenerator::new());
        generator.fail_on(&[1]);
        let skill = skill_with(generator.clone(), json!({"request_delay_seconds": 0}));
        skill.execute(pages(3), &context("run-d")).await;

        generator.fail_on(&[]);
        let outcome = skill.retry_one("run-d", 1, true).await.unwrap();

        assert!(outcome.success);
        let state = skill.registry().snapshot("run-d").unwrap();
        assert!(state.failed.is_empty());
        assert_eq!(state.generated.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_options_fail_lazily() {
        let generator = Arc::new(RecordingGenerator::new());
        let skill = skill_with(generator.clone(), json!({"max_workers": 0}));

        let result = skill.execute(pages(1), &context("run-e")).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("max_workers"));
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_input() {
        let skill = skill_with(Arc::new(RecordingGenerator::new()), json!({}));

        let result = skill.execute(json!({"pages": "nope"}), &context("run-f")).await;
        assert!(result.error.unwrap().starts_with("invalid input: not a batch input"));

        let result = skill.execute(json!({"pages": []}), &context("run-f")).await;
        assert_eq!(result.error.as_deref(), Some("batch has no generation tasks"));
    }

    /// Compressor that crashes, used to fault the batch stream itself.
    struct CrashingCompressor;

    impl ArtifactCompressor for CrashingCompressor {
        fn compress(&self, _data: &Bytes, _max_bytes: usize) -> Bytes {
            panic!("compressor crashed")
        }
    }

    #[tokio::test]
    async fn test_panic_while_streaming_settles_status() {
        let generator = Arc::new(RecordingGenerator::new());
        let skill = BatchGenerationSkill::new(
            "generate_artifacts",
            json!({"request_delay_seconds": 0, "thumbnail_max_bytes": 0})
                .as_object()
                .cloned()
                .unwrap(),
            generator,
            Arc::new(InMemoryStorage::new()),
            Arc::new(CrashingCompressor),
        );
        let ctx = context("run-h");

        let events: Vec<SkillEvent> = skill.execute_stream(pages(2), &ctx).collect().await;

        match events.last() {
            Some(SkillEvent::Finished(result)) => {
                assert!(!result.success);
                assert_eq!(
                    result.error.as_deref(),
                    Some("skill panicked: compressor crashed")
                );
                assert_eq!(result.metadata["skill"], "generate_artifacts");
            }
            other => panic!("unexpected tail {:?}", other),
        }
        assert_eq!(skill.status(), SkillStatus::Failed);
    }

    #[tokio::test]
    async fn test_out_of_range_delay_fails_without_panicking() {
        let generator = Arc::new(RecordingGenerator::new());
        let skill = skill_with(generator.clone(), json!({"request_delay_seconds": 1e20}));
        let ctx = context("run-i");

        let events: Vec<SkillEvent> = skill.execute_stream(pages(2), &ctx).collect().await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            SkillEvent::Finished(result) => {
                assert!(result.error.as_deref().unwrap().contains("request_delay_seconds"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(skill.status(), SkillStatus::Failed);
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_context_never_starts_a_batch() {
        let generator = Arc::new(RecordingGenerator::new());
        let skill = skill_with(generator.clone(), json!({}));
        let token = CancellationToken::new();
        token.cancel();
        let ctx = context("run-g").with_cancellation(token);

        let result = skill.execute(pages(2), &ctx).await;

        assert_eq!(result.error.as_deref(), Some("cancelled"));
        assert_eq!(skill.status(), SkillStatus::Cancelled);
        assert!(generator.calls().is_empty());
    }
}
