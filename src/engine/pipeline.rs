// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Linear pipeline of skills.
//!
//! A run threads each skill's output into the next skill's input and reports
//! its progress as a lazily consumed stream of [`PipelineEvent`]s:
//!
//! ```text
//! start ─▶ (progress ─▶ [notices] ─▶ step_complete) × N ─▶ finish
//!                          │
//!                          └─ failure ─▶ error ─▶ finish(success = false)
//! ```
//!
//! Every event is also handed to the pipeline's own handlers and, when an
//! [`EventBus`] is attached, published on it.

use async_stream::stream;
use futures::stream::{BoxStream, StreamExt};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::ops::Deref;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::context::PipelineContext;
use super::pipeline_event::{PipelineEvent, PipelineEventKind};
use crate::errors::SkillError;
use crate::events::{Event, EventBus, EventEmitter, HandlerId};
use crate::observability::messages::engine::{
    PipelineRunCancelled, PipelineRunCompleted, PipelineRunFailed, PipelineRunStarted,
    PipelineStepStarted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Skill, SkillEvent, SkillResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Idle,
    Running,
    /// Reserved; no transition leads here yet.
    Paused,
    Success,
    Failed,
    Cancelled,
}

/// What [`Pipeline::run`] returns once the event stream is drained.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRunOutcome {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
    pub events: Vec<PipelineEvent>,
    pub run_id: String,
    pub elapsed_time: f64,
}

impl PipelineRunOutcome {
    fn from_events(run_id: String, events: Vec<PipelineEvent>) -> Self {
        let finish = events.iter().rev().find(|event| event.is_finish());
        let result = finish.and_then(|event| event.result.clone()).unwrap_or(Value::Null);
        let elapsed_time = finish
            .and_then(|event| event.metadata.get("elapsed_time"))
            .and_then(Value::as_f64)
            .unwrap_or_default();

        Self {
            success: result["success"].as_bool().unwrap_or(false),
            data: result["data"].clone(),
            error: result["error"].as_str().map(str::to_string),
            events,
            run_id,
            elapsed_time,
        }
    }
}

/// Ordered skills run as one workflow. The skill list is fixed at construction.
pub struct Pipeline {
    name: String,
    description: String,
    skills: Vec<Arc<dyn Skill>>,
    variables: Map<String, Value>,
    status: Mutex<PipelineStatus>,
    last_context: Mutex<Option<PipelineContext>>,
    cancellation: Mutex<CancellationToken>,
    handlers: EventEmitter,
    event_bus: Option<Arc<EventBus>>,
    channel_id: Option<String>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("skills", &self.skill_names())
            .field("status", &self.status())
            .finish()
    }
}

impl Pipeline {
    pub fn new(name: impl Into<String>, skills: Vec<Arc<dyn Skill>>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            skills,
            variables: Map::new(),
            status: Mutex::new(PipelineStatus::Idle),
            last_context: Mutex::new(None),
            cancellation: Mutex::new(CancellationToken::new()),
            handlers: EventEmitter::new(),
            event_bus: None,
            channel_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Variables merged into every run, beneath the caller's own.
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    /// Publish every event on `bus`, into the channel named after the run id.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Publish into a fixed channel instead of the per-run one.
    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn skills(&self) -> &[Arc<dyn Skill>] {
        &self.skills
    }

    pub fn skill_names(&self) -> Vec<&str> {
        self.skills.iter().map(|skill| skill.name()).collect()
    }

    pub fn get_skill(&self, name: &str) -> Option<Arc<dyn Skill>> {
        self.skills.iter().find(|skill| skill.name() == name).cloned()
    }

    pub fn status(&self) -> PipelineStatus {
        *self.status.lock()
    }

    fn set_status(&self, status: PipelineStatus) {
        *self.status.lock() = status;
    }

    /// Snapshot of the most recent run's context.
    pub fn context(&self) -> Option<PipelineContext> {
        self.last_context.lock().clone()
    }

    /// Register a handler for every event of every run. Handler faults are logged and dropped.
    pub fn add_event_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers.on_all(handler)
    }

    pub fn remove_event_handler(&self, id: HandlerId) -> bool {
        self.handlers.off(id)
    }

    /// Request cancellation of the active run.
    ///
    /// Takes effect before the next step starts and before un-started batch
    /// tasks; an in-flight generator call is never interrupted. Returns `false`
    /// when no run is active.
    pub fn cancel(&self) -> bool {
        let mut status = self.status.lock();
        if *status != PipelineStatus::Running {
            return false;
        }
        *status = PipelineStatus::Cancelled;
        self.cancellation.lock().cancel();
        true
    }

    /// Run the pipeline, yielding events as the run progresses.
    pub fn run_stream(&self, input: Value, variables: Map<String, Value>) -> BoxStream<'_, PipelineEvent> {
        drive(self, Uuid::new_v4().to_string(), input, variables)
    }

    /// As [`run_stream`](Self::run_stream), with a run id chosen by the caller.
    pub fn run_stream_with_id(
        &self,
        run_id: impl Into<String>,
        input: Value,
        variables: Map<String, Value>,
    ) -> BoxStream<'_, PipelineEvent> {
        drive(self, run_id.into(), input, variables)
    }

    /// Owning form of [`run_stream_with_id`](Self::run_stream_with_id), for streams that outlive the caller.
    pub fn run_shared(
        self: Arc<Self>,
        run_id: impl Into<String>,
        input: Value,
        variables: Map<String, Value>,
    ) -> BoxStream<'static, PipelineEvent> {
        drive(self, run_id.into(), input, variables)
    }

    /// Drain a run and summarize it.
    pub async fn run(&self, input: Value, variables: Map<String, Value>) -> PipelineRunOutcome {
        let run_id = Uuid::new_v4().to_string();
        let span = PipelineRunStarted {
            pipeline: &self.name,
            run_id: &run_id,
            total_steps: self.skills.len(),
        }
        .span("run");

        let events: Vec<PipelineEvent> = self
            .run_stream_with_id(run_id.clone(), input, variables)
            .collect()
            .instrument(span)
            .await;
        PipelineRunOutcome::from_events(run_id, events)
    }

    fn dispatch(&self, event: PipelineEvent, run_id: &str) -> PipelineEvent {
        if self.handlers.handler_count() > 0 || self.event_bus.is_some() {
            let bus_event = event
                .to_event()
                .with_source(self.name.clone())
                .with_correlation_id(run_id);
            self.handlers.emit(&bus_event);
            if let Some(bus) = &self.event_bus {
                let channel = self.channel_id.as_deref().unwrap_or(run_id);
                bus.publish(&bus_event, Some(channel));
            }
        }
        event
    }

    /// Settle a cancelled run and build its `finish` event.
    fn conclude_cancelled(
        &self,
        context: &mut PipelineContext,
        completed_steps: usize,
        cancelled_at_step: usize,
    ) -> PipelineEvent {
        PipelineRunCancelled {
            pipeline: &self.name,
            run_id: &context.run_id,
            completed_steps,
        }
        .log();
        context.finish();
        self.set_status(PipelineStatus::Cancelled);
        self.remember(context);
        PipelineEvent::new(PipelineEventKind::Finish)
            .with_result(json!({"success": false, "error": "cancelled", "cancelled": true}))
            .with_metadata("cancelled_at_step", cancelled_at_step)
            .with_metadata("elapsed_time", context.elapsed_secs())
    }

    fn remember(&self, context: &PipelineContext) {
        *self.last_context.lock() = Some(context.clone());
    }
}

fn failed_step(skill: &str, error: impl Into<String>) -> SkillResult {
    SkillResult::failed(error).with_metadata("skill", skill)
}

fn drive<'a, P>(
    pipeline: P,
    run_id: String,
    input: Value,
    variables: Map<String, Value>,
) -> BoxStream<'a, PipelineEvent>
where
    P: Deref<Target = Pipeline> + Send + 'a,
{
    let events = stream! {
        let this: &Pipeline = &pipeline;
        let token = CancellationToken::new();
        *this.cancellation.lock() = token.clone();

        let mut merged = this.variables.clone();
        merged.extend(variables);
        let mut context = PipelineContext::with_run_id(run_id, merged);
        context.start();
        this.remember(&context);
        this.set_status(PipelineStatus::Running);

        let total = this.skills.len();
        PipelineRunStarted {
            pipeline: &this.name,
            run_id: &context.run_id,
            total_steps: total,
        }
        .log();

        yield this.dispatch(
            PipelineEvent::new(PipelineEventKind::Start)
                .with_metadata("pipeline", this.name.as_str())
                .with_metadata("total_steps", total)
                .with_metadata("run_id", context.run_id.as_str()),
            &context.run_id,
        );

        let mut current = input;
        for (offset, skill) in this.skills.iter().enumerate() {
            let step = offset + 1;
            let skill_name = skill.name();
            context.current_step = step;

            if token.is_cancelled() {
                let finish = this.conclude_cancelled(&mut context, offset, step);
                yield this.dispatch(finish, &context.run_id);
                return;
            }

            yield this.dispatch(
                PipelineEvent::new(PipelineEventKind::Progress)
                    .at_step(step, skill_name)
                    .with_progress(step as f64 / total as f64)
                    .with_metadata("status", "running"),
                &context.run_id,
            );

            PipelineStepStarted {
                pipeline: &this.name,
                step,
                skill: skill_name,
            }
            .log();

            let step_context = context.step_context(&this.name, step, token.clone());
            let mut skill_events = skill.execute_stream(current.clone(), &step_context);
            let mut finished = None;
            loop {
                match AssertUnwindSafe(skill_events.next()).catch_unwind().await {
                    Ok(Some(SkillEvent::Notice(notice))) => {
                        yield this.dispatch(PipelineEvent::notice(step, total, skill_name, notice), &context.run_id);
                    }
                    Ok(Some(SkillEvent::Finished(result))) => {
                        finished = Some(result);
                        break;
                    }
                    Ok(None) => break,
                    Err(payload) => {
                        finished = Some(failed_step(skill_name, SkillError::from_panic(payload).to_string()));
                        break;
                    }
                }
            }
            drop(skill_events);

            let result = finished
                .unwrap_or_else(|| failed_step(skill_name, "skill stream ended without a result"));
            context.results.insert(skill_name.to_string(), result.clone());

            if !result.success {
                let error = result.error.clone().unwrap_or_else(|| "unknown error".to_string());
                let cancelled = token.is_cancelled();
                context.finish();
                PipelineRunFailed {
                    pipeline: &this.name,
                    run_id: &context.run_id,
                    step,
                    skill: skill_name,
                    error: &error,
                }
                .log();

                yield this.dispatch(
                    PipelineEvent::new(PipelineEventKind::Error)
                        .at_step(step, skill_name)
                        .with_error(error.as_str())
                        .with_metadata("status", "failed"),
                    &context.run_id,
                );

                this.set_status(if cancelled {
                    PipelineStatus::Cancelled
                } else {
                    PipelineStatus::Failed
                });
                this.remember(&context);

                let mut summary = json!({"success": false, "error": error});
                if cancelled {
                    summary["cancelled"] = json!(true);
                }
                yield this.dispatch(
                    PipelineEvent::new(PipelineEventKind::Finish)
                        .with_result(summary)
                        .with_metadata("failed_at_step", step)
                        .with_metadata("elapsed_time", context.elapsed_secs()),
                    &context.run_id,
                );
                return;
            }

            yield this.dispatch(
                PipelineEvent::new(PipelineEventKind::StepComplete)
                    .at_step(step, skill_name)
                    .with_result(result.to_json())
                    .with_progress(step as f64 / total as f64)
                    .with_metadata("status", "completed"),
                &context.run_id,
            );
            current = result.data;
        }

        // A cancel that lands during the last step still cancels the run.
        if token.is_cancelled() {
            let finish = this.conclude_cancelled(&mut context, total, total);
            yield this.dispatch(finish, &context.run_id);
            return;
        }

        context.finish();
        this.set_status(PipelineStatus::Success);
        this.remember(&context);
        PipelineRunCompleted {
            pipeline: &this.name,
            run_id: &context.run_id,
            duration: std::time::Duration::from_secs_f64(context.elapsed_secs().max(0.0)),
        }
        .log();

        yield this.dispatch(
            PipelineEvent::new(PipelineEventKind::Finish)
                .with_result(json!({"success": true, "data": current}))
                .with_metadata("elapsed_time", context.elapsed_secs())
                .with_metadata("total_steps", total),
            &context.run_id,
        );
    };
    events.boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::{AppendSkill, FailingSkill};

    fn kinds(events: &[PipelineEvent]) -> Vec<String> {
        events.iter().map(|e| e.kind.to_string()).collect()
    }

    #[tokio::test]
    async fn test_run_threads_data_between_steps() {
        let pipeline = Pipeline::new(
            "letters",
            vec![
                Arc::new(AppendSkill::new("a", "-a")) as Arc<dyn Skill>,
                Arc::new(AppendSkill::new("b", "-b")),
            ],
        );

        let outcome = pipeline.run(json!("x"), Map::new()).await;

        assert!(outcome.success);
        assert_eq!(outcome.data, json!("x-a-b"));
        assert_eq!(outcome.error, None);
        assert_eq!(pipeline.status(), PipelineStatus::Success);
        assert_eq!(
            kinds(&outcome.events),
            vec!["start", "progress", "step_complete", "progress", "step_complete", "finish"]
        );
        let context = pipeline.context().unwrap();
        assert_eq!(context.run_id, outcome.run_id);
        assert_eq!(context.results.len(), 2);
        assert!(context.ended_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_reports_failing_step() {
        let pipeline = Pipeline::new(
            "broken",
            vec![
                Arc::new(AppendSkill::new("a", "-a")) as Arc<dyn Skill>,
                Arc::new(FailingSkill::new("b", "no pages")),
            ],
        );

        let outcome = pipeline.run(json!("x"), Map::new()).await;

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("invalid input: no pages"));
        assert_eq!(pipeline.status(), PipelineStatus::Failed);
        let finish = outcome.events.last().unwrap();
        assert_eq!(finish.metadata["failed_at_step"], 2);
    }

    #[tokio::test]
    async fn test_cancel_requires_running() {
        let pipeline = Pipeline::new("idle", Vec::new());
        assert!(!pipeline.cancel());
        assert_eq!(pipeline.status(), PipelineStatus::Idle);
    }

    #[tokio::test]
    async fn test_empty_pipeline_finishes_with_input() {
        let pipeline = Pipeline::new("empty", Vec::new());
        let outcome = pipeline.run(json!({"k": 1}), Map::new()).await;

        assert!(outcome.success);
        assert_eq!(outcome.data, json!({"k": 1}));
        assert_eq!(kinds(&outcome.events), vec!["start", "finish"]);
    }

    #[test]
    fn test_get_skill_by_name() {
        let pipeline = Pipeline::new(
            "lookup",
            vec![Arc::new(AppendSkill::new("append", "!")) as Arc<dyn Skill>],
        );

        assert_eq!(pipeline.get_skill("append").unwrap().name(), "append");
        assert!(pipeline.get_skill("missing").is_none());
        assert_eq!(pipeline.skill_names(), vec!["append"]);
    }
}
