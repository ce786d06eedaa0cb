// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::traits::{SkillContext, SkillResult};

/// State of one pipeline run. Fresh per run, never shared between runs.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub run_id: String,
    pub variables: Map<String, Value>,
    pub results: HashMap<String, SkillResult>,
    pub current_step: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl PipelineContext {
    /// New context with a random UUID v4 run id.
    pub fn new(variables: Map<String, Value>) -> Self {
        Self::with_run_id(Uuid::new_v4().to_string(), variables)
    }

    pub fn with_run_id(run_id: impl Into<String>, variables: Map<String, Value>) -> Self {
        Self {
            run_id: run_id.into(),
            variables,
            results: HashMap::new(),
            current_step: 0,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
    }

    pub fn finish(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// Seconds between start and end, or start and now while still running.
    pub fn elapsed_secs(&self) -> f64 {
        match self.started_at {
            Some(started) => {
                let end = self.ended_at.unwrap_or_else(Utc::now);
                (end - started).num_milliseconds() as f64 / 1000.0
            }
            None => 0.0,
        }
    }

    /// Context handed to the skill at `step`: `{pipeline, step, run_id, ..variables}`.
    ///
    /// Caller variables win over the three reserved keys, as they are merged last.
    pub fn step_context(
        &self,
        pipeline: &str,
        step: usize,
        cancellation: CancellationToken,
    ) -> SkillContext {
        let mut variables = Map::new();
        variables.insert("pipeline".into(), json!(pipeline));
        variables.insert("step".into(), json!(step));
        variables.insert("run_id".into(), json!(self.run_id));
        variables.extend(self.variables.clone());
        SkillContext::new(variables).with_cancellation(cancellation)
    }
}
