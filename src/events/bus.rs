// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::channel::{SseChannel, DEFAULT_CHANNEL_CAPACITY};
use super::emitter::EventEmitter;
use super::event::Event;
use crate::observability::messages::events::ChannelLifecycle;
use crate::observability::messages::StructuredLog;

/// One emitter plus a registry of streaming channels keyed by caller-supplied id.
///
/// Pipelines take an `Arc<EventBus>` at composition time. [`get_event_bus`]
/// hands out a process-wide instance for callers that want one shared bus.
#[derive(Debug)]
pub struct EventBus {
    emitter: EventEmitter,
    channels: RwLock<HashMap<String, Arc<SseChannel>>>,
    default_capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_default_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_default_capacity(default_capacity: usize) -> Self {
        Self {
            emitter: EventEmitter::new(),
            channels: RwLock::new(HashMap::new()),
            default_capacity,
        }
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    /// Return the channel for `id`, creating it when absent.
    ///
    /// An existing channel keeps its original capacity.
    pub fn create_channel(&self, id: &str, capacity: Option<usize>) -> Arc<SseChannel> {
        let mut channels = self.channels.write();
        if let Some(existing) = channels.get(id) {
            return Arc::clone(existing);
        }
        let channel = Arc::new(SseChannel::new(
            id,
            capacity.unwrap_or(self.default_capacity),
        ));
        channels.insert(id.to_string(), Arc::clone(&channel));
        ChannelLifecycle {
            channel_id: id,
            action: "created",
            capacity: channel.capacity(),
        }
        .log();
        channel
    }

    pub fn get_channel(&self, id: &str) -> Option<Arc<SseChannel>> {
        self.channels.read().get(id).cloned()
    }

    /// Close and remove a channel. Returns whether it existed.
    pub fn close_channel(&self, id: &str) -> bool {
        let removed = self.channels.write().remove(id);
        match removed {
            Some(channel) => {
                channel.close();
                ChannelLifecycle {
                    channel_id: id,
                    action: "closed",
                    capacity: channel.capacity(),
                }
                .log();
                true
            }
            None => false,
        }
    }

    pub fn channel_ids(&self) -> Vec<String> {
        self.channels.read().keys().cloned().collect()
    }

    /// Emit to handlers and, when a channel exists for `channel_id`, enqueue there too.
    ///
    /// Returns whether the event was enqueued on a channel.
    pub fn publish(&self, event: &Event, channel_id: Option<&str>) -> bool {
        self.emitter.emit(event);
        self.enqueue(event, channel_id)
    }

    /// Like [`publish`](Self::publish), also running async handlers.
    pub async fn publish_async(&self, event: &Event, channel_id: Option<&str>) -> bool {
        self.emitter.emit_async(event).await;
        self.enqueue(event, channel_id)
    }

    fn enqueue(&self, event: &Event, channel_id: Option<&str>) -> bool {
        channel_id
            .and_then(|id| self.get_channel(id))
            .map(|channel| channel.publish(event.clone()))
            .unwrap_or(false)
    }
}

static EVENT_BUS: Lazy<Arc<EventBus>> = Lazy::new(|| Arc::new(EventBus::new()));

/// The process-wide bus, initialized on first use.
pub fn get_event_bus() -> Arc<EventBus> {
    Arc::clone(&EVENT_BUS)
}
