// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process publish/subscribe for [`Event`]s.
//!
//! Handlers are registered per event type or as wildcards, each in its own
//! ordered list. Emission snapshots the matching handlers before calling them, so
//! handlers may register or remove handlers without deadlocking. A handler that
//! returns an error or panics is logged and counted; it never stops the other
//! handlers or the emitting pipeline.

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::event::{Event, EventType};
use crate::errors::panic_message;
use crate::observability::messages::events::EventHandlerFailed;
use crate::observability::messages::StructuredLog;

pub type EventHandler = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;
pub type AsyncEventHandler =
    Arc<dyn Fn(Event) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Token returned by registration, used to remove the handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registered<H> {
    id: HandlerId,
    handler: H,
}

#[derive(Default)]
struct HandlerTable {
    sync: HashMap<EventType, Vec<Registered<EventHandler>>>,
    sync_wildcard: Vec<Registered<EventHandler>>,
    asynchronous: HashMap<EventType, Vec<Registered<AsyncEventHandler>>>,
    async_wildcard: Vec<Registered<AsyncEventHandler>>,
}

impl HandlerTable {
    fn len(&self) -> usize {
        self.sync.values().map(Vec::len).sum::<usize>()
            + self.sync_wildcard.len()
            + self.asynchronous.values().map(Vec::len).sum::<usize>()
            + self.async_wildcard.len()
    }
}

#[derive(Default)]
pub struct EventEmitter {
    handlers: RwLock<HandlerTable>,
    next_id: AtomicU64,
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> HandlerId {
        HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a handler for one event type.
    pub fn on<F>(&self, event_type: impl Into<EventType>, handler: F) -> HandlerId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.handlers
            .write()
            .sync
            .entry(event_type.into())
            .or_default()
            .push(Registered {
                id,
                handler: Arc::new(handler),
            });
        id
    }

    /// Register a handler for every event type.
    pub fn on_all<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.handlers.write().sync_wildcard.push(Registered {
            id,
            handler: Arc::new(handler),
        });
        id
    }

    /// Register an async handler for one event type. Only `emit_async` runs it.
    pub fn on_async<F, Fut>(&self, event_type: impl Into<EventType>, handler: F) -> HandlerId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = self.allocate_id();
        let handler: AsyncEventHandler = Arc::new(move |event| handler(event).boxed());
        self.handlers
            .write()
            .asynchronous
            .entry(event_type.into())
            .or_default()
            .push(Registered { id, handler });
        id
    }

    pub fn on_all_async<F, Fut>(&self, handler: F) -> HandlerId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = self.allocate_id();
        let handler: AsyncEventHandler = Arc::new(move |event| handler(event).boxed());
        self.handlers
            .write()
            .async_wildcard
            .push(Registered { id, handler });
        id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut table = self.handlers.write();
        let before = table.len();
        for list in table.sync.values_mut() {
            list.retain(|r| r.id != id);
        }
        table.sync_wildcard.retain(|r| r.id != id);
        for list in table.asynchronous.values_mut() {
            list.retain(|r| r.id != id);
        }
        table.async_wildcard.retain(|r| r.id != id);
        table.len() != before
    }

    /// Drop the handlers of one event type, or every handler when `None`.
    pub fn clear(&self, event_type: Option<&EventType>) {
        let mut table = self.handlers.write();
        match event_type {
            Some(event_type) => {
                table.sync.remove(event_type);
                table.asynchronous.remove(event_type);
            }
            None => *table = HandlerTable::default(),
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    fn sync_handlers_for(&self, event_type: &EventType) -> Vec<EventHandler> {
        let table = self.handlers.read();
        table
            .sync
            .get(event_type)
            .into_iter()
            .flatten()
            .chain(table.sync_wildcard.iter())
            .map(|r| Arc::clone(&r.handler))
            .collect()
    }

    fn async_handlers_for(&self, event_type: &EventType) -> Vec<AsyncEventHandler> {
        let table = self.handlers.read();
        table
            .asynchronous
            .get(event_type)
            .into_iter()
            .flatten()
            .chain(table.async_wildcard.iter())
            .map(|r| Arc::clone(&r.handler))
            .collect()
    }

    /// Invoke every matching synchronous handler, in registration order, type-specific first.
    ///
    /// Returns the number of handlers that faulted.
    pub fn emit(&self, event: &Event) -> usize {
        let mut faults = 0;
        for handler in self.sync_handlers_for(&event.event_type) {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(event)));
            if let Some(error) = fault_message(outcome) {
                faults += 1;
                EventHandlerFailed {
                    event_type: event.event_type.as_str(),
                    error: &error,
                }
                .log();
            }
        }
        faults
    }

    /// Invoke synchronous handlers, then run async handlers concurrently.
    ///
    /// Faults are collected and logged, never propagated. Returns the total fault count.
    pub async fn emit_async(&self, event: &Event) -> usize {
        let mut faults = self.emit(event);

        let pending = self
            .async_handlers_for(&event.event_type)
            .into_iter()
            .map(|handler| {
                let event = event.clone();
                AssertUnwindSafe(async move { handler(event).await }).catch_unwind()
            });

        for outcome in join_all(pending).await {
            if let Some(error) = fault_message(outcome) {
                faults += 1;
                EventHandlerFailed {
                    event_type: event.event_type.as_str(),
                    error: &error,
                }
                .log();
            }
        }
        faults
    }
}

fn fault_message(
    outcome: Result<anyhow::Result<()>, Box<dyn std::any::Any + Send>>,
) -> Option<String> {
    match outcome {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(format!("{:#}", err)),
        Err(payload) => Some(format!("handler panicked: {}", panic_message(payload.as_ref()))),
    }
}
