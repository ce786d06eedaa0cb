// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::fmt;

use crate::events::{Event, EventType};
use crate::traits::SkillNotice;

/// Kind tag of a [`PipelineEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEventKind {
    Start,
    Progress,
    StepComplete,
    Error,
    Finish,
    /// A skill notice relayed under its own tag, e.g. `artifact_complete`.
    Notice(String),
}

impl PipelineEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            PipelineEventKind::Start => "start",
            PipelineEventKind::Progress => "progress",
            PipelineEventKind::StepComplete => "step_complete",
            PipelineEventKind::Error => "error",
            PipelineEventKind::Finish => "finish",
            PipelineEventKind::Notice(tag) => tag,
        }
    }

    fn event_type(&self) -> EventType {
        match self {
            PipelineEventKind::Start => EventType::PipelineStart,
            PipelineEventKind::Progress => EventType::PipelineProgress,
            PipelineEventKind::StepComplete => EventType::PipelineStepComplete,
            PipelineEventKind::Error => EventType::PipelineError,
            PipelineEventKind::Finish => EventType::PipelineFinish,
            PipelineEventKind::Notice(tag) => EventType::Custom(tag.clone()),
        }
    }
}

impl fmt::Display for PipelineEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of a pipeline run's event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineEvent {
    pub kind: PipelineEventKind,
    pub step: Option<usize>,
    pub skill: Option<String>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub progress: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Map<String, Value>,
}

impl PipelineEvent {
    pub fn new(kind: PipelineEventKind) -> Self {
        Self {
            kind,
            step: None,
            skill: None,
            result: None,
            error: None,
            progress: None,
            timestamp: Utc::now(),
            metadata: Map::new(),
        }
    }

    pub(crate) fn at_step(mut self, step: usize, skill: &str) -> Self {
        self.step = Some(step);
        self.skill = Some(skill.to_string());
        self
    }

    pub(crate) fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub(crate) fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub(crate) fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress.clamp(0.0, 1.0));
        self
    }

    pub(crate) fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// A relayed skill notice, carrying the notice data as metadata.
    ///
    /// The notice's own progress is placed inside step `step` of `total_steps`.
    pub(crate) fn notice(step: usize, total_steps: usize, skill: &str, notice: SkillNotice) -> Self {
        let mut event = Self::new(PipelineEventKind::Notice(notice.event)).at_step(step, skill);
        if let Some(fraction) = notice.progress {
            let done = step.saturating_sub(1) as f64 + fraction.clamp(0.0, 1.0);
            event = event.with_progress(done / total_steps.max(1) as f64);
        }
        event.error = notice.error;
        event.metadata = notice.data;
        event
    }

    pub fn is_finish(&self) -> bool {
        self.kind == PipelineEventKind::Finish
    }

    /// JSON form. Unset fields and empty metadata are omitted.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("event".into(), json!(self.kind.as_str()));
        if let Some(step) = self.step {
            map.insert("step".into(), json!(step));
        }
        if let Some(skill) = &self.skill {
            map.insert("skill".into(), json!(skill));
        }
        if let Some(result) = &self.result {
            map.insert("result".into(), result.clone());
        }
        if let Some(error) = &self.error {
            map.insert("error".into(), json!(error));
        }
        if let Some(progress) = self.progress {
            map.insert("progress".into(), json!(progress));
        }
        map.insert(
            "timestamp".into(),
            json!(self.timestamp.timestamp_millis() as f64 / 1000.0),
        );
        if !self.metadata.is_empty() {
            map.insert("metadata".into(), Value::Object(self.metadata.clone()));
        }
        Value::Object(map)
    }

    /// Convert to a bus [`Event`]; the JSON form becomes the event data.
    pub fn to_event(&self) -> Event {
        let data = match self.to_json() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut event = Event::new(self.kind.event_type(), data);
        event.timestamp = self.timestamp;
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_omits_unset_fields() {
        let json = PipelineEvent::new(PipelineEventKind::Start).to_json();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();

        assert_eq!(keys.len(), 2);
        assert_eq!(json["event"], "start");
        assert!(json["timestamp"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_step_event_json() {
        let event = PipelineEvent::new(PipelineEventKind::Progress)
            .at_step(2, "outline")
            .with_progress(0.5)
            .with_metadata("status", "running");
        let json = event.to_json();

        assert_eq!(json["step"], 2);
        assert_eq!(json["skill"], "outline");
        assert_eq!(json["progress"], 0.5);
        assert_eq!(json["metadata"], json!({"status": "running"}));
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_bus_event_types() {
        let test_cases = vec![
            (PipelineEventKind::Start, "pipeline.start"),
            (PipelineEventKind::StepComplete, "pipeline.step_complete"),
            (PipelineEventKind::Finish, "pipeline.finish"),
            (PipelineEventKind::Notice("artifact_complete".into()), "artifact_complete"),
        ];

        for (kind, expected) in test_cases {
            let event = PipelineEvent::new(kind).to_event();
            assert_eq!(event.event_type.as_str(), expected);
        }
    }

    #[test]
    fn test_notice_keeps_error_and_data() {
        let mut data = Map::new();
        data.insert("index".into(), json!(3));
        let event = PipelineEvent::notice(
            2,
            2,
            "generate_artifacts",
            SkillNotice {
                event: "artifact_error".into(),
                error: Some("quota".into()),
                data,
                progress: None,
            },
        );

        assert_eq!(event.kind.as_str(), "artifact_error");
        assert_eq!(event.error.as_deref(), Some("quota"));
        assert_eq!(event.progress, None);
        assert_eq!(event.to_event().data["metadata"]["index"], 3);
    }

    #[test]
    fn test_notice_progress_is_placed_within_its_step() {
        struct TestCase {
            step: usize,
            total_steps: usize,
            fraction: f64,
            expected: f64,
        }

        let test_cases = vec![
            TestCase { step: 1, total_steps: 2, fraction: 0.0, expected: 0.0 },
            TestCase { step: 2, total_steps: 2, fraction: 0.5, expected: 0.75 },
            TestCase { step: 3, total_steps: 4, fraction: 1.0, expected: 0.75 },
            TestCase { step: 1, total_steps: 1, fraction: 2.0, expected: 1.0 },
        ];

        for case in test_cases {
            let notice = SkillNotice {
                event: "artifact_progress".into(),
                error: None,
                data: Map::new(),
                progress: Some(case.fraction),
            };
            let event = PipelineEvent::notice(case.step, case.total_steps, "render", notice);
            assert_eq!(event.progress, Some(case.expected), "step {}", case.step);
        }
    }

    #[test]
    fn test_progress_is_clamped() {
        let event = PipelineEvent::new(PipelineEventKind::Progress).with_progress(1.5);
        assert_eq!(event.progress, Some(1.0));
    }
}
