// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Collaborator backends for The Inkwell generation pipelines.
//!
//! Skills never talk to a remote service directly. They hold trait objects for
//! the four collaborator seams defined in [`crate::traits::collaborators`]:
//! text generation, artifact generation, artifact storage and artifact
//! compression. This module provides the implementations that ship with the
//! crate; remote backends (HTTP, gRPC) are supplied by the host application
//! through [`crate::config::Collaborators`].
//!
//! # Available Backends
//!
//! ## Local Backend
//! Deterministic, offline implementations:
//! - **EchoTextGenerator**: Returns a configured response, or echoes the prompt
//! - **SvgPlaceholderGenerator**: Renders each task as a labelled SVG card
//! - **FileSystemStorage**: Writes `<root>/<run_id>/<filename>`
//! - **InMemoryStorage**: Keeps artifacts in a map, for tests and previews
//! - **PassthroughCompressor**: Leaves artifacts untouched
//!
//! ## Stub Backend (Test-Only)
//! Doubles for scheduler, skill and pipeline tests (only available in test builds):
//! - **RecordingGenerator**: Records requests, fails or panics on chosen indices
//! - **MarkingCompressor**: Tags its output so propagation is observable
//! - **ScriptedTextGenerator**: Fixed response or fixed error
//! - **AppendSkill / FailingSkill / NoticeSkill / UnrulySkill**: Pipeline step doubles
//!
//! # Architecture
//!
//! ```text
//! Configuration → LocalBackendFactory → Collaborators → SkillFactory → Pipeline
//! ```
//!
//! # Examples
//!
//! ```rust
//! use the_inkwell::backends::local::LocalBackendFactory;
//! use the_inkwell::config::{BackendConfig, BackendType};
//!
//! let config = BackendConfig {
//!     backend: BackendType::Local,
//!     implementation: Some("svg_placeholder".to_string()),
//!     endpoint: None,
//!     options: serde_json::Map::new(),
//! };
//!
//! let generator = LocalBackendFactory::create_artifact_generator(&config)?;
//! assert_eq!(generator.file_extension(), "svg");
//! # Ok::<(), the_inkwell::errors::SkillFactoryError>(())
//! ```

pub mod local;
#[cfg(test)]
pub mod stub;
