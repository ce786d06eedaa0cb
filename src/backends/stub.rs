// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test doubles for collaborators and skills.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::batch::GenerationRequest;
use crate::errors::{GenerationError, SkillError};
use crate::traits::{
    ArtifactCompressor, ArtifactGenerator, Skill, SkillContext, SkillCore, SkillEvent,
    SkillNotice, SkillResult, TextGenerator, TextOptions,
};

/// One call observed by [`RecordingGenerator`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub index: usize,
    pub reference: Option<Bytes>,
    pub user_references: Vec<Bytes>,
}

/// Artifact generator that records every request and fails on demand.
///
/// Successful calls return `artifact-<index>`.
#[derive(Default)]
pub struct RecordingGenerator {
    calls: Mutex<Vec<RecordedCall>>,
    failing: Mutex<HashSet<usize>>,
    panicking: Mutex<HashSet<usize>>,
    latency: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of indices that fail.
    pub fn fail_on(&self, indices: &[usize]) {
        *self.failing.lock() = indices.iter().copied().collect();
    }

    pub fn panic_on(&self, index: usize) {
        self.panicking.lock().insert(index);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactGenerator for RecordingGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
        reference: Option<&Bytes>,
    ) -> Result<Bytes, GenerationError> {
        let index = request.index();
        self.calls.lock().push(RecordedCall {
            index,
            reference: reference.cloned(),
            user_references: request.user_references.clone(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.lock().contains(&index) {
            panic!("generator crashed on {}", index);
        }
        if self.failing.lock().contains(&index) {
            return Err(GenerationError::remote(format!("429 quota exhausted on {}", index)));
        }
        Ok(Bytes::from(format!("artifact-{}", index)))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Compressor that tags its output so tests can see it was applied.
///
/// Produces `small:<max_bytes>:<input>`.
pub struct MarkingCompressor;

impl ArtifactCompressor for MarkingCompressor {
    fn compress(&self, data: &Bytes, max_bytes: usize) -> Bytes {
        Bytes::from(format!(
            "small:{}:{}",
            max_bytes,
            String::from_utf8_lossy(data)
        ))
    }
}

/// Text generator returning a fixed response, or a fixed error.
pub struct ScriptedTextGenerator {
    outcome: Result<String, String>,
    prompts: Mutex<Vec<String>>,
    options: Mutex<Vec<TextOptions>>,
}

impl ScriptedTextGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            outcome: Ok(response.into()),
            prompts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            prompts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn last_options(&self) -> Option<TextOptions> {
        self.options.lock().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedTextGenerator {
    async fn generate_text(
        &self,
        prompt: &str,
        options: &TextOptions,
    ) -> Result<String, GenerationError> {
        self.prompts.lock().push(prompt.to_string());
        self.options.lock().push(options.clone());
        self.outcome.clone().map_err(GenerationError::remote)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Skill appending a suffix to its string input.
pub struct AppendSkill {
    core: SkillCore,
    suffix: String,
    calls: AtomicUsize,
}

impl AppendSkill {
    pub fn new(name: &str, suffix: &str) -> Self {
        Self {
            core: SkillCore::new(name, "1.0.0"),
            suffix: suffix.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Skill for AppendSkill {
    fn core(&self) -> &SkillCore {
        &self.core
    }

    async fn run(&self, input: Value, _context: &SkillContext) -> Result<SkillResult, SkillError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = match input {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(SkillResult::ok(json!(format!("{}{}", text, self.suffix))))
    }
}

/// Skill that always returns a failed result.
pub struct FailingSkill {
    core: SkillCore,
    message: String,
    calls: AtomicUsize,
}

impl FailingSkill {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            core: SkillCore::new(name, "1.0.0"),
            message: message.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Skill for FailingSkill {
    fn core(&self) -> &SkillCore {
        &self.core
    }

    async fn run(&self, _input: Value, _context: &SkillContext) -> Result<SkillResult, SkillError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SkillError::InvalidInput(self.message.clone()))
    }
}

/// Skill whose stream yields notices before its result.
pub struct NoticeSkill {
    core: SkillCore,
    notices: usize,
}

impl NoticeSkill {
    pub fn new(name: &str, notices: usize) -> Self {
        Self {
            core: SkillCore::new(name, "1.0.0"),
            notices,
        }
    }
}

#[async_trait]
impl Skill for NoticeSkill {
    fn core(&self) -> &SkillCore {
        &self.core
    }

    async fn run(&self, input: Value, _context: &SkillContext) -> Result<SkillResult, SkillError> {
        Ok(SkillResult::ok(input))
    }

    fn execute_stream<'a>(
        &'a self,
        input: Value,
        context: &'a SkillContext,
    ) -> BoxStream<'a, SkillEvent> {
        let count = self.notices;
        let notices = (0..count).map(move |i| {
            let mut data = Map::new();
            data.insert("index".into(), json!(i));
            SkillEvent::Notice(SkillNotice {
                event: "artifact_progress".into(),
                error: None,
                data,
                progress: Some((i + 1) as f64 / (count + 1) as f64),
            })
        });
        stream::iter(notices)
            .chain(stream::once(async move {
                SkillEvent::Finished(self.execute(input, context).await)
            }))
            .boxed()
    }
}

/// Skill whose execution stream misbehaves outside the `execute` fault boundary.
pub struct UnrulySkill {
    core: SkillCore,
    panic: bool,
}

impl UnrulySkill {
    /// Panics while the stream is polled.
    pub fn panicking(name: &str) -> Self {
        Self {
            core: SkillCore::new(name, "1.0.0"),
            panic: true,
        }
    }

    /// Ends the stream without a result.
    pub fn silent(name: &str) -> Self {
        Self {
            core: SkillCore::new(name, "1.0.0"),
            panic: false,
        }
    }
}

#[async_trait]
impl Skill for UnrulySkill {
    fn core(&self) -> &SkillCore {
        &self.core
    }

    async fn run(&self, input: Value, _context: &SkillContext) -> Result<SkillResult, SkillError> {
        Ok(SkillResult::ok(input))
    }

    fn execute_stream<'a>(
        &'a self,
        _input: Value,
        _context: &'a SkillContext,
    ) -> BoxStream<'a, SkillEvent> {
        let panic = self.panic;
        stream::once(async move {
            if panic {
                panic!("stream exploded");
            }
        })
        .filter_map(|_| async { None::<SkillEvent> })
        .boxed()
    }
}
