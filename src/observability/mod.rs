// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Diagnostic and operational log lines come from message structs in
//! [`messages`], never from ad-hoc format strings at the call site. Each message
//! implements `Display` and [`messages::StructuredLog`], so the same record can
//! be rendered as text or emitted with its fields attached.
//!
//! # Usage
//!
//! ```rust
//! use the_inkwell::observability::messages::skill::SkillExecutionFailed;
//! use the_inkwell::observability::messages::StructuredLog;
//!
//! SkillExecutionFailed {
//!     skill: "outline",
//!     error: "quota exhausted",
//! }
//! .log();
//! ```

pub mod messages;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global `tracing` subscriber.
///
/// Filtering follows `RUST_LOG`, falling back to `default_directive` when it is
/// unset or invalid. Calling this twice is harmless; the second install is ignored.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}
