// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Event model: typed events, an in-process emitter, bounded streaming
//! channels and the bus that ties them together.

pub mod bus;
pub mod channel;
pub mod emitter;
pub mod event;

pub use bus::{get_event_bus, EventBus};
pub use channel::{SseChannel, DEFAULT_CHANNEL_CAPACITY, STREAM_POLL_INTERVAL};
pub use emitter::{AsyncEventHandler, EventEmitter, EventHandler, HandlerId};
pub use event::{Event, EventType};
