// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Type tag of an [`Event`].
///
/// Serialized as its dotted wire name (`pipeline.start`, `skill.error`, ...).
/// Relayed skill notices and other ad-hoc tags travel as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    PipelineStart,
    PipelineProgress,
    PipelineStepComplete,
    PipelineError,
    PipelineFinish,
    SkillStart,
    SkillProgress,
    SkillComplete,
    SkillError,
    Info,
    Warning,
    Error,
    Debug,
    Custom(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::PipelineStart => "pipeline.start",
            EventType::PipelineProgress => "pipeline.progress",
            EventType::PipelineStepComplete => "pipeline.step_complete",
            EventType::PipelineError => "pipeline.error",
            EventType::PipelineFinish => "pipeline.finish",
            EventType::SkillStart => "skill.start",
            EventType::SkillProgress => "skill.progress",
            EventType::SkillComplete => "skill.complete",
            EventType::SkillError => "skill.error",
            EventType::Info => "info",
            EventType::Warning => "warning",
            EventType::Error => "error",
            EventType::Debug => "debug",
            EventType::Custom(tag) => tag,
        }
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "pipeline.start" => EventType::PipelineStart,
            "pipeline.progress" => EventType::PipelineProgress,
            "pipeline.step_complete" => EventType::PipelineStepComplete,
            "pipeline.error" => EventType::PipelineError,
            "pipeline.finish" => EventType::PipelineFinish,
            "skill.start" => EventType::SkillStart,
            "skill.progress" => EventType::SkillProgress,
            "skill.complete" => EventType::SkillComplete,
            "skill.error" => EventType::SkillError,
            "info" => EventType::Info,
            "warning" => EventType::Warning,
            "error" => EventType::Error,
            "debug" => EventType::Debug,
            _ => EventType::Custom(tag),
        }
    }
}

impl From<&str> for EventType {
    fn from(tag: &str) -> Self {
        EventType::from(tag.to_string())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic typed notification carried by the emitter and streaming channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: EventType,
    pub data: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub source: Option<String>,
    pub correlation_id: Option<String>,
}

impl Event {
    pub fn new(event_type: impl Into<EventType>, data: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
            source: None,
            correlation_id: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Seconds since the Unix epoch, with sub-second precision.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp.timestamp_millis() as f64 / 1000.0
    }

    /// Transport envelope `{type, data, timestamp}`.
    pub fn to_envelope(&self) -> Value {
        json!({
            "type": self.event_type.as_str(),
            "data": self.data,
            "timestamp": self.timestamp_secs(),
        })
    }

    /// Render as one server-sent-events frame.
    pub fn to_sse(&self) -> String {
        format!(
            "event: {}\ndata: {}\n\n",
            self.event_type.as_str(),
            Value::Object(self.data.clone())
        )
    }
}
