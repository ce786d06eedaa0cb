// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concrete skill kinds.
//!
//! | kind                 | input                        | output                        |
//! |----------------------|------------------------------|-------------------------------|
//! | `analyze`            | `{text, analysis_type?}`     | `{analysis_type, result}`     |
//! | `outline`            | `{topic, images?}`           | `{outline, pages, topic, ..}` |
//! | `content`            | `{topic, outline, ..}`       | input + `titles, copywriting, tags` |
//! | `generate_artifacts` | batch input (`pages`, ..)    | batch summary                 |
//!
//! The text skills read `model`, `temperature` and `max_output_tokens` from
//! their options and pass them to the text generator.

pub mod analyze;
pub mod content;
pub mod generate;
pub mod outline;
pub mod parse;

pub use analyze::{AnalysisType, AnalyzeSkill};
pub use content::{ContentSkill, PostCopy};
pub use generate::BatchGenerationSkill;
pub use outline::{parse_outline, OutlinePage, OutlineSkill};
pub use parse::extract_json;

use crate::errors::{GenerationError, SkillError};
use crate::traits::{SkillCore, TextOptions};

/// Turn a text generator fault into the message shown to the user.
///
/// `fallback` names the failed operation when the fault is not recognized.
pub(crate) fn diagnose(err: GenerationError, fallback: &str) -> SkillError {
    let message = err.to_string().to_lowercase();
    let summary = if message.contains("api_key") || message.contains("401") {
        "authentication failed, check the text backend credentials"
    } else if message.contains("model") || message.contains("404") {
        "model unavailable, check the configured model name and access"
    } else if message.contains("rate") || message.contains("429") {
        "quota exhausted, wait and retry"
    } else {
        fallback
    };
    SkillError::Diagnosed {
        summary: summary.to_string(),
        source: err,
    }
}

/// Per-kind generation defaults, overridable through skill options.
pub(crate) struct TextDefaults {
    pub model: &'static str,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl TextDefaults {
    pub(crate) fn resolve(&self, core: &SkillCore) -> TextOptions {
        TextOptions {
            model: Some(core.option_str("model").unwrap_or(self.model).to_string()),
            temperature: Some(
                core.option_f64("temperature")
                    .map(|t| t as f32)
                    .unwrap_or(self.temperature),
            ),
            max_output_tokens: Some(
                core.option_u64("max_output_tokens")
                    .map(|m| u32::try_from(m).unwrap_or(u32::MAX))
                    .unwrap_or(self.max_output_tokens),
            ),
            references: Vec::new(),
        }
    }
}
