// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for skill instantiation and collaborator construction.

use crate::config::BackendType;
use std::error::Error;
use std::fmt;

/// Errors that can occur while building skills and their backends from configuration
#[derive(Debug)]
pub enum SkillFactoryError {
    /// A backend type is recognized but not implemented in this crate
    BackendNotImplemented {
        role: &'static str,
        backend: BackendType,
    },

    /// A local backend names an implementation this crate does not ship
    UnknownImplementation {
        role: &'static str,
        implementation: String,
    },

    /// A skill kind needs a collaborator that was neither configured nor injected
    MissingCollaborator {
        skill_name: String,
        collaborator: &'static str,
    },

    /// Failed to create a skill from configuration
    SkillCreationFailed { skill_name: String, reason: String },
}

impl fmt::Display for SkillFactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillFactoryError::BackendNotImplemented { role, backend } => {
                let description = match backend {
                    BackendType::Local => "in-process",
                    BackendType::Http => "HTTP client",
                    BackendType::Grpc => "gRPC client",
                };
                write!(
                    f,
                    "Backend type '{:?}' is not implemented for the {} backend. {} backends are supplied by the host application.",
                    backend, role, description
                )
            }
            SkillFactoryError::UnknownImplementation {
                role,
                implementation,
            } => {
                write!(
                    f,
                    "Unknown local {} implementation: '{}'",
                    role, implementation
                )
            }
            SkillFactoryError::MissingCollaborator {
                skill_name,
                collaborator,
            } => {
                write!(
                    f,
                    "Skill '{}' requires a {} but none is configured",
                    skill_name, collaborator
                )
            }
            SkillFactoryError::SkillCreationFailed { skill_name, reason } => {
                write!(f, "Failed to create skill '{}': {}", skill_name, reason)
            }
        }
    }
}

impl Error for SkillFactoryError {}
