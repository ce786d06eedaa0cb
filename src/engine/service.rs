// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_stream::stream;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use super::pipeline::Pipeline;
use super::pipeline_event::PipelineEvent;
use crate::config::{validate_pipeline_config, Collaborators, PipelineConfig, RuntimeBuilder};
use crate::errors::ConfigError;
use crate::events::{EventBus, SseChannel};

/// A run started through [`PipelineService::start`].
pub struct ServiceRun {
    pub run_id: String,
    pub events: BoxStream<'static, PipelineEvent>,
    /// The run's bus channel, when the service publishes to a bus.
    pub channel: Option<Arc<SseChannel>>,
}

/// Registry of named pipelines that runs them on demand and tracks active runs.
///
/// Every run builds a fresh [`Pipeline`] from its registered configuration, so
/// runs of the same pipeline never share status or context. Collaborators are
/// shared: either the ones injected with [`with_collaborators`](Self::with_collaborators)
/// or the local backends each configuration names.
#[derive(Default)]
pub struct PipelineService {
    configs: RwLock<BTreeMap<String, PipelineConfig>>,
    collaborators: Option<Collaborators>,
    event_bus: Option<Arc<EventBus>>,
    active: Arc<RwLock<HashMap<String, Arc<Pipeline>>>>,
}

impl PipelineService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = Some(collaborators);
        self
    }

    /// Publish every run's events on `bus`, in a channel named after the run id.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Register a validated configuration under its name, replacing any previous one.
    pub fn register(&self, config: PipelineConfig) -> Result<(), ConfigError> {
        validate_pipeline_config(&config).map_err(ConfigError::Validation)?;
        self.configs.write().insert(config.name.clone(), config);
        Ok(())
    }

    /// `(name, description)` of every registered pipeline, sorted by name.
    pub fn available_pipelines(&self) -> Vec<(String, String)> {
        self.configs
            .read()
            .values()
            .map(|config| (config.name.clone(), config.description.clone()))
            .collect()
    }

    pub fn create_pipeline(&self, name: &str) -> Result<Pipeline, ConfigError> {
        let config = self
            .configs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownPipeline(name.to_string()))?;

        let pipeline = match &self.collaborators {
            Some(collaborators) => RuntimeBuilder::with_collaborators(&config, collaborators)?,
            None => RuntimeBuilder::from_config(&config)?,
        };
        Ok(match &self.event_bus {
            Some(bus) => pipeline.with_event_bus(Arc::clone(bus)),
            None => pipeline,
        })
    }

    /// Start a run of the named pipeline.
    ///
    /// The run is tracked until its stream ends or is dropped. With a bus, the
    /// run's channel is created before the first event and closed after the last.
    pub fn start(
        &self,
        name: &str,
        input: Value,
        variables: Map<String, Value>,
    ) -> Result<ServiceRun, ConfigError> {
        let pipeline = Arc::new(self.create_pipeline(name)?);
        let run_id = Uuid::new_v4().to_string();
        let channel = self
            .event_bus
            .as_ref()
            .map(|bus| bus.create_channel(&run_id, None));

        self.active
            .write()
            .insert(run_id.clone(), Arc::clone(&pipeline));
        let tracker = ActiveRun {
            run_id: run_id.clone(),
            active: Arc::clone(&self.active),
            bus: self.event_bus.clone(),
        };

        let mut inner = pipeline.run_shared(run_id.clone(), input, variables);
        let events = stream! {
            let _tracker = tracker;
            while let Some(event) = inner.next().await {
                yield event;
            }
        };

        Ok(ServiceRun {
            run_id,
            events: events.boxed(),
            channel,
        })
    }

    /// Run the named pipeline to completion and return every event.
    pub async fn run(
        &self,
        name: &str,
        input: Value,
        variables: Map<String, Value>,
    ) -> Result<Vec<PipelineEvent>, ConfigError> {
        let run = self.start(name, input, variables)?;
        Ok(run.events.collect().await)
    }

    pub fn get_active_pipeline(&self, run_id: &str) -> Option<Arc<Pipeline>> {
        self.active.read().get(run_id).cloned()
    }

    pub fn active_run_ids(&self) -> Vec<String> {
        self.active.read().keys().cloned().collect()
    }

    /// Cancel an active run. Returns `false` for unknown or already finished runs.
    pub fn cancel(&self, run_id: &str) -> bool {
        self.get_active_pipeline(run_id)
            .map(|pipeline| pipeline.cancel())
            .unwrap_or(false)
    }
}

/// Untracks a run, and closes its channel, when the run's stream goes away.
struct ActiveRun {
    run_id: String,
    active: Arc<RwLock<HashMap<String, Arc<Pipeline>>>>,
    bus: Option<Arc<EventBus>>,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.active.write().remove(&self.run_id);
        if let Some(bus) = &self.bus {
            bus.close_channel(&self.run_id);
        }
    }
}
