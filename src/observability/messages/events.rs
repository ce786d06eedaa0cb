// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for event distribution: handler faults and channel lifecycle.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An event handler returned an error or panicked. Other handlers still run.
///
/// # Log Level
/// `warn!` - Isolated fault
///
/// # Example
/// ```
/// use the_inkwell::observability::messages::events::EventHandlerFailed;
///
/// let msg = EventHandlerFailed {
///     event_type: "pipeline.progress",
///     error: "socket closed",
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct EventHandlerFailed<'a> {
    pub event_type: &'a str,
    pub error: &'a str,
}

impl Display for EventHandlerFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Event handler for '{}' failed: {}",
            self.event_type, self.error
        )
    }
}

impl StructuredLog for EventHandlerFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            event_type = self.event_type,
            error = self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "event_handler_failed",
            span_name = name,
            event_type = self.event_type,
        )
    }
}

/// A streaming channel was created or closed.
///
/// # Log Level
/// `debug!` - Bookkeeping
pub struct ChannelLifecycle<'a> {
    pub channel_id: &'a str,
    pub action: &'a str,
    pub capacity: usize,
}

impl Display for ChannelLifecycle<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Channel '{}' {} (capacity {})",
            self.channel_id, self.action, self.capacity
        )
    }
}

impl StructuredLog for ChannelLifecycle<'_> {
    fn log(&self) {
        tracing::debug!(
            channel_id = self.channel_id,
            action = self.action,
            capacity = self.capacity,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "channel",
            span_name = name,
            channel_id = self.channel_id,
            action = self.action,
        )
    }
}

/// A full channel evicted its oldest buffered event.
///
/// # Log Level
/// `trace!` - Expected under sustained overflow
pub struct ChannelEvicted {
    pub capacity: usize,
}

impl Display for ChannelEvicted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Channel full at {} events, evicted oldest", self.capacity)
    }
}

impl StructuredLog for ChannelEvicted {
    fn log(&self) {
        tracing::trace!(capacity = self.capacity, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("channel_evicted", span_name = name, capacity = self.capacity)
    }
}
