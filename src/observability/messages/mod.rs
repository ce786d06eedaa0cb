// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit the record with its fields attached at the level
//! documented on the type.
//!
//! # Organization
//!
//! * `engine` - pipeline run lifecycle
//! * `skill` - skill execution lifecycle
//! * `batch` - batch generation runs, reference handling and retries
//! * `events` - emitter handler faults and channel lifecycle
//! * `validation` - configuration validation
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_inkwell::observability::messages::engine::PipelineRunStarted;
//! use the_inkwell::observability::messages::StructuredLog;
//!
//! let msg = PipelineRunStarted {
//!     pipeline: "storyboard",
//!     run_id: "4f7c",
//!     total_steps: 2,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod batch;
pub mod engine;
pub mod events;
pub mod skill;
pub mod validation;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a `tracing` event.
    fn log(&self);

    /// Build a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
