// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;      // collaborator backends
pub mod batch;         // batch artifact scheduler
pub mod config;        // config + skill registry
pub mod engine;        // pipeline execution
pub mod errors;        // error handling
pub mod events;        // event model, emitter, channels
pub mod observability;
pub mod skills;        // concrete skill kinds
pub mod traits;        // unified abstractions
