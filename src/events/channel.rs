// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded, drop-oldest streaming channel.
//!
//! Producers never wait: publishing into a full queue evicts exactly one oldest
//! event first, so a slow consumer loses intermediate events rather than
//! stalling the pipeline. A channel has a single logical consumer; the
//! subscriber set is bookkeeping only and does not fan out.

use futures::Stream;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use super::event::Event;
use crate::observability::messages::events::ChannelEvicted;
use crate::observability::messages::StructuredLog;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// How long one streaming poll waits for new events before checking for close.
pub const STREAM_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct SseChannel {
    id: String,
    capacity: usize,
    queue: Mutex<VecDeque<Event>>,
    subscribers: Mutex<HashSet<String>>,
    closed: AtomicBool,
    notify: Notify,
}

impl SseChannel {
    /// Create a channel. A capacity of zero is raised to one.
    pub fn new(id: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            id: id.into(),
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            subscribers: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Enqueue an event without blocking. Returns `false` once the channel is closed.
    pub fn publish(&self, event: Event) -> bool {
        if self.is_closed() {
            return false;
        }
        {
            let mut queue = self.queue.lock();
            if queue.len() >= self.capacity {
                queue.pop_front();
                ChannelEvicted {
                    capacity: self.capacity,
                }
                .log();
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
        true
    }

    /// Take everything currently buffered.
    pub fn drain(&self) -> Vec<Event> {
        self.queue.lock().drain(..).collect()
    }

    /// Drain buffered events, waiting up to `timeout` for the first one when empty.
    pub async fn get_events(&self, timeout: Duration) -> Vec<Event> {
        let events = self.drain();
        if !events.is_empty() || timeout.is_zero() || self.is_closed() {
            return events;
        }
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
        self.drain()
    }

    /// Stop accepting events. Buffered events remain drainable.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn subscribe(&self, subscriber_id: impl Into<String>) -> bool {
        self.subscribers.lock().insert(subscriber_id.into())
    }

    pub fn unsubscribe(&self, subscriber_id: &str) -> bool {
        self.subscribers.lock().remove(subscriber_id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Stream SSE frames until the channel is closed and drained.
    pub fn stream(self: Arc<Self>) -> impl Stream<Item = String> + Send + 'static {
        async_stream::stream! {
            loop {
                let events = self.get_events(STREAM_POLL_INTERVAL).await;
                let idle = events.is_empty();
                for event in events {
                    yield event.to_sse();
                }
                if idle && self.is_closed() {
                    break;
                }
            }
        }
    }
}
