// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The skill execution contract.
//!
//! A skill wraps one processing step of a pipeline. Implementors provide `run`;
//! the provided `execute` method wraps `pre_run`, `run` and `post_run`, drives the
//! status transitions and folds every error or panic into a failed [`SkillResult`],
//! so a skill never raises past its own boundary.
//!
//! ```text
//! pending ──execute──▶ running ──▶ success
//!                              └──▶ failed | cancelled
//! ```
//!
//! Skills that report sub-progress override [`Skill::execute_stream`] and yield
//! [`SkillEvent::Notice`] items before the terminal [`SkillEvent::Finished`].

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use crate::errors::SkillError;
use crate::observability::messages::skill::{
    SkillExecutionCompleted, SkillExecutionFailed, SkillExecutionStarted,
};
use crate::observability::messages::StructuredLog;

/// Skill-specific configuration, kept as the JSON object it was declared with.
pub type SkillOptions = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

/// Outcome of one skill execution. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillResult {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SkillResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
            metadata: Map::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn to_json(&self) -> Value {
        json!({
            "success": self.success,
            "data": self.data,
            "error": self.error,
            "metadata": self.metadata,
        })
    }
}

/// Per-step execution context handed to a skill.
///
/// Holds the merged pipeline variables (`pipeline`, `step`, `run_id` plus every
/// caller-supplied variable) and the run's cancellation token.
#[derive(Debug, Clone, Default)]
pub struct SkillContext {
    variables: Map<String, Value>,
    cancellation: CancellationToken,
}

impl SkillContext {
    pub fn new(variables: Map<String, Value>) -> Self {
        Self {
            variables,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.variables.get(key).and_then(Value::as_str)
    }

    pub fn run_id(&self) -> Option<&str> {
        self.get_str("run_id")
    }

    pub fn step(&self) -> Option<u64> {
        self.variables.get("step").and_then(Value::as_u64)
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Intermediate notification a skill relays to its pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillNotice {
    /// Event tag the pipeline publishes the notice under.
    pub event: String,
    pub error: Option<String>,
    pub data: Map<String, Value>,
    /// Fraction of the skill's own work done, in `0.0..=1.0`.
    pub progress: Option<f64>,
}

/// Item of a skill's execution stream. A well-formed stream ends with exactly one `Finished`.
#[derive(Debug, Clone, PartialEq)]
pub enum SkillEvent {
    Notice(SkillNotice),
    Finished(SkillResult),
}

/// Identity, options and status shared by every skill implementation.
#[derive(Debug)]
pub struct SkillCore {
    name: String,
    version: String,
    description: String,
    options: SkillOptions,
    status: Mutex<SkillStatus>,
}

impl SkillCore {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            options: SkillOptions::new(),
            status: Mutex::new(SkillStatus::Pending),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_options(mut self, options: SkillOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> &SkillOptions {
        &self.options
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub fn option_f64(&self, key: &str) -> Option<f64> {
        self.options.get(key).and_then(Value::as_f64)
    }

    pub fn option_u64(&self, key: &str) -> Option<u64> {
        self.options.get(key).and_then(Value::as_u64)
    }

    pub fn status(&self) -> SkillStatus {
        *self.status.lock()
    }

    pub(crate) fn set_status(&self, status: SkillStatus) {
        *self.status.lock() = status;
    }
}

/// Check that every required key is present and non-empty when the input is an object.
///
/// Non-object inputs are left to the skill, which may coerce a bare string; only
/// a null input is rejected outright.
pub fn check_required_inputs(
    skill: &str,
    required: &[&'static str],
    input: &Value,
) -> Result<(), SkillError> {
    let missing = |key: &str| SkillError::MissingInput {
        skill: skill.to_string(),
        input: key.to_string(),
    };

    match input {
        Value::Object(map) => {
            for key in required {
                let present = match map.get(*key) {
                    None | Some(Value::Null) => false,
                    Some(Value::String(s)) => !s.trim().is_empty(),
                    Some(Value::Array(items)) => !items.is_empty(),
                    Some(_) => true,
                };
                if !present {
                    return Err(missing(key));
                }
            }
            Ok(())
        }
        Value::Null => match required.first() {
            Some(key) => Err(missing(key)),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

/// Mark the skill running and log the start. Returns the execution span.
pub(crate) fn begin_execution(core: &SkillCore, context: &SkillContext) -> Span {
    core.set_status(SkillStatus::Running);
    let start_msg = SkillExecutionStarted {
        skill: core.name(),
        version: core.version(),
        step: context.step(),
    };
    let span = start_msg.span("skill_execution");
    start_msg.log();
    span
}

/// Fold an execution outcome into a result, settle the status and log the end.
pub(crate) fn conclude_execution(
    core: &SkillCore,
    outcome: Result<SkillResult, SkillError>,
    context: &SkillContext,
    started: Instant,
) -> SkillResult {
    let result = outcome.unwrap_or_else(|err| {
        SkillResult::failed(err.to_string()).with_metadata("skill", core.name())
    });

    let status = if result.success {
        SkillStatus::Success
    } else if context.is_cancelled() {
        SkillStatus::Cancelled
    } else {
        SkillStatus::Failed
    };
    core.set_status(status);

    match &result.error {
        Some(error) if !result.success => SkillExecutionFailed {
            skill: core.name(),
            error,
        }
        .log(),
        _ => SkillExecutionCompleted {
            skill: core.name(),
            duration: started.elapsed(),
        }
        .log(),
    }

    result
}

#[async_trait]
pub trait Skill: Send + Sync {
    fn core(&self) -> &SkillCore;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn version(&self) -> &str {
        self.core().version()
    }

    fn status(&self) -> SkillStatus {
        self.core().status()
    }

    /// Input keys that must be present before any remote call is made.
    fn required_inputs(&self) -> &[&'static str] {
        &[]
    }

    fn pre_run(&self, input: Value, _context: &SkillContext) -> Result<Value, SkillError> {
        check_required_inputs(self.name(), self.required_inputs(), &input)?;
        Ok(input)
    }

    async fn run(&self, input: Value, context: &SkillContext) -> Result<SkillResult, SkillError>;

    fn post_run(&self, result: SkillResult, _context: &SkillContext) -> SkillResult {
        result
    }

    /// Run the skill behind its fault boundary. Never panics, never returns an error.
    async fn execute(&self, input: Value, context: &SkillContext) -> SkillResult {
        let core = self.core();
        let span = begin_execution(core, context);
        let started = Instant::now();
        let outcome = AssertUnwindSafe(async {
            let input = self.pre_run(input, context)?;
            let result = self.run(input, context).await?;
            Ok::<_, SkillError>(self.post_run(result, context))
        })
        .catch_unwind()
        .instrument(span)
        .await
        .unwrap_or_else(|payload| Err(SkillError::from_panic(payload)));

        conclude_execution(core, outcome, context, started)
    }

    /// Streaming form consumed by the pipeline. The default yields only the final result.
    fn execute_stream<'a>(
        &'a self,
        input: Value,
        context: &'a SkillContext,
    ) -> BoxStream<'a, SkillEvent> {
        stream::once(async move { SkillEvent::Finished(self.execute(input, context).await) })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UppercaseSkill {
        core: SkillCore,
    }

    #[async_trait]
    impl Skill for UppercaseSkill {
        fn core(&self) -> &SkillCore {
            &self.core
        }

        fn required_inputs(&self) -> &[&'static str] {
            &["text"]
        }

        async fn run(&self, input: Value, _context: &SkillContext) -> Result<SkillResult, SkillError> {
            let text = input["text"]
                .as_str()
                .ok_or_else(|| SkillError::InvalidInput("text must be a string".into()))?;
            Ok(SkillResult::ok(json!(text.to_uppercase())))
        }
    }

    struct PanickingSkill {
        core: SkillCore,
    }

    #[async_trait]
    impl Skill for PanickingSkill {
        fn core(&self) -> &SkillCore {
            &self.core
        }

        async fn run(&self, _input: Value, _context: &SkillContext) -> Result<SkillResult, SkillError> {
            panic!("backend exploded");
        }
    }

    #[tokio::test]
    async fn test_execute_success_transitions_status() {
        let skill = UppercaseSkill {
            core: SkillCore::new("upper", "1.0.0"),
        };
        assert_eq!(skill.status(), SkillStatus::Pending);

        let result = skill
            .execute(json!({"text": "hello"}), &SkillContext::default())
            .await;

        assert!(result.success);
        assert_eq!(result.data, json!("HELLO"));
        assert_eq!(skill.status(), SkillStatus::Success);
    }

    #[tokio::test]
    async fn test_missing_required_input_fails_before_run() {
        let skill = UppercaseSkill {
            core: SkillCore::new("upper", "1.0.0"),
        };

        let result = skill.execute(json!({"text": "  "}), &SkillContext::default()).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("skill 'upper' requires input 'text'"));
        assert_eq!(result.metadata["skill"], json!("upper"));
        assert_eq!(skill.status(), SkillStatus::Failed);
    }

    #[tokio::test]
    async fn test_panic_is_folded_into_failed_result() {
        let skill = PanickingSkill {
            core: SkillCore::new("explode", "0.1.0"),
        };

        let result = skill.execute(Value::Null, &SkillContext::default()).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("backend exploded"));
        assert_eq!(skill.status(), SkillStatus::Failed);
    }

    #[tokio::test]
    async fn test_execute_can_be_repeated_on_same_instance() {
        let skill = UppercaseSkill {
            core: SkillCore::new("upper", "1.0.0"),
        };
        let ctx = SkillContext::default();

        assert!(!skill.execute(json!({}), &ctx).await.success);
        assert_eq!(skill.status(), SkillStatus::Failed);
        assert!(skill.execute(json!({"text": "again"}), &ctx).await.success);
        assert_eq!(skill.status(), SkillStatus::Success);
    }

    #[tokio::test]
    async fn test_default_execute_stream_yields_single_result() {
        let skill = UppercaseSkill {
            core: SkillCore::new("upper", "1.0.0"),
        };
        let ctx = SkillContext::default();

        let events: Vec<SkillEvent> = skill
            .execute_stream(json!({"text": "abc"}), &ctx)
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            SkillEvent::Finished(result) => assert_eq!(result.data, json!("ABC")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_check_required_inputs_accepts_bare_strings() {
        assert!(check_required_inputs("s", &["topic"], &json!("a topic")).is_ok());
        assert!(check_required_inputs("s", &["topic"], &Value::Null).is_err());
        assert!(check_required_inputs("s", &["pages"], &json!({"pages": []})).is_err());
        assert!(check_required_inputs("s", &[], &Value::Null).is_ok());
    }

    #[test]
    fn test_skill_result_json_shape() {
        let result = SkillResult::ok(json!({"n": 1})).with_metadata("skill", "count");
        let json = result.to_json();
        assert_eq!(json["success"], json!(true));
        assert_eq!(json["data"]["n"], json!(1));
        assert_eq!(json["error"], Value::Null);
        assert_eq!(json["metadata"]["skill"], json!("count"));
    }
}
