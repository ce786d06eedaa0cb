// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline execution: run state, the event record, the pipeline state machine
//! and a service that runs registered pipelines by name.

pub mod context;
pub mod pipeline;
pub mod pipeline_event;
pub mod service;

pub use context::PipelineContext;
pub use pipeline::{Pipeline, PipelineRunOutcome, PipelineStatus};
pub use pipeline_event::{PipelineEvent, PipelineEventKind};
pub use service::{PipelineService, ServiceRun};
