// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::errors::SkillError;
use crate::skills::{parse::extract_json, TextDefaults};
use crate::traits::{Skill, SkillContext, SkillCore, SkillOptions, SkillResult, TextGenerator};

const DEFAULTS: TextDefaults = TextDefaults {
    model: "gemini-2.0-flash-exp",
    temperature: 0.7,
    max_output_tokens: 4000,
};

/// Which structured view of the text to ask the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    General,
    Concept,
    Structure,
}

impl AnalysisType {
    /// Unknown names fall back to `General`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "concept" => AnalysisType::Concept,
            "structure" => AnalysisType::Structure,
            _ => AnalysisType::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::General => "general",
            AnalysisType::Concept => "concept",
            AnalysisType::Structure => "structure",
        }
    }

    fn prompt(&self, text: &str) -> String {
        let schema = match self {
            AnalysisType::General => {
                r#"{
    "summary": "a short summary",
    "keywords": ["keyword 1", "keyword 2"],
    "topics": ["topic 1", "topic 2"],
    "sentiment": "positive/negative/neutral",
    "word_count": 123
}"#
            }
            AnalysisType::Concept => {
                r#"{
    "main_concept": "the central concept",
    "sub_concepts": ["sub-concept 1", "sub-concept 2"],
    "relationships": [
        {"from": "concept A", "to": "concept B", "type": "contains/depends on/contrasts"}
    ],
    "domain": "field of study",
    "complexity": "basic/intermediate/advanced"
}"#
            }
            AnalysisType::Structure => {
                r#"{
    "type": "article/list/dialogue/narrative",
    "sections": [
        {"title": "section title", "summary": "section summary"}
    ],
    "hierarchy_depth": 2,
    "has_introduction": true,
    "has_conclusion": true
}"#
            }
        };
        let task = match self {
            AnalysisType::General => "Analyze the following text and extract its key information:",
            AnalysisType::Concept => "Analyze the following academic text and extract its core concepts:",
            AnalysisType::Structure => "Analyze the structure of the following text:",
        };
        format!("{task}\n\n{text}\n\nRespond with JSON in this shape:\n{schema}")
    }
}

/// Text analysis through the text generator, returning the model's JSON.
///
/// Input is `{"text": ..., "analysis_type": ...}` or a bare string. Output is
/// `{"analysis_type": ..., "result": {...}}`.
pub struct AnalyzeSkill {
    core: SkillCore,
    text: Arc<dyn TextGenerator>,
}

impl AnalyzeSkill {
    pub const KIND: &'static str = "analyze";

    pub fn new(name: impl Into<String>, options: SkillOptions, text: Arc<dyn TextGenerator>) -> Self {
        Self {
            core: SkillCore::new(name, "1.0.0")
                .with_description("Analyze text and extract key information")
                .with_options(options),
            text,
        }
    }
}

#[async_trait]
impl Skill for AnalyzeSkill {
    fn core(&self) -> &SkillCore {
        &self.core
    }

    fn required_inputs(&self) -> &[&'static str] {
        &["text"]
    }

    async fn run(&self, input: Value, _context: &SkillContext) -> Result<SkillResult, SkillError> {
        let default_type = self.core.option_str("analysis_type").unwrap_or("general");
        let (text, requested) = match &input {
            Value::String(text) => (text.as_str(), default_type),
            Value::Object(map) => (
                map.get("text").and_then(Value::as_str).unwrap_or_default(),
                map.get("analysis_type")
                    .and_then(Value::as_str)
                    .unwrap_or(default_type),
            ),
            _ => ("", default_type),
        };
        if text.trim().is_empty() {
            return Err(SkillError::MissingInput {
                skill: self.name().to_string(),
                input: "text".to_string(),
            });
        }

        let analysis_type = AnalysisType::parse(requested);
        let options = DEFAULTS.resolve(&self.core);
        let response = self
            .text
            .generate_text(&analysis_type.prompt(text), &options)
            .await?;
        let result = extract_json(self.name(), &response)?;

        Ok(SkillResult::ok(json!({
            "analysis_type": analysis_type.as_str(),
            "result": result,
        }))
        .with_metadata("skill", self.name())
        .with_metadata("model", options.model.unwrap_or_default())
        .with_metadata("input_length", text.chars().count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::ScriptedTextGenerator;
    use crate::traits::SkillStatus;
    use serde_json::Map;

    fn skill_with(generator: Arc<ScriptedTextGenerator>, options: SkillOptions) -> AnalyzeSkill {
        AnalyzeSkill::new("analyze", options, generator)
    }

    #[tokio::test]
    async fn test_analysis_returns_extracted_json() {
        let generator = Arc::new(ScriptedTextGenerator::new(
            "```json\n{\"summary\": \"tides\", \"keywords\": [\"moon\"]}\n```",
        ));
        let skill = skill_with(generator.clone(), Map::new());

        let result = skill
            .execute(
                json!({"text": "The moon pulls the sea.", "analysis_type": "general"}),
                &SkillContext::default(),
            )
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.data["analysis_type"], "general");
        assert_eq!(result.data["result"]["summary"], "tides");
        assert_eq!(result.metadata["model"], "gemini-2.0-flash-exp");
        assert_eq!(result.metadata["input_length"], 23);
        assert!(generator.prompts()[0].contains("The moon pulls the sea."));
    }

    #[tokio::test]
    async fn test_prompt_follows_analysis_type() {
        let test_cases = vec![
            ("concept", "main_concept", "concept"),
            ("structure", "hierarchy_depth", "structure"),
            ("poetry", "sentiment", "general"),
        ];

        for (requested, marker, resolved) in test_cases {
            let generator = Arc::new(ScriptedTextGenerator::new("{}"));
            let skill = skill_with(generator.clone(), Map::new());
            let result = skill
                .execute(
                    json!({"text": "body", "analysis_type": requested}),
                    &SkillContext::default(),
                )
                .await;

            assert!(result.success, "{}", requested);
            assert_eq!(result.data["analysis_type"], resolved);
            assert!(generator.prompts()[0].contains(marker), "{}", requested);
        }
    }

    #[tokio::test]
    async fn test_bare_string_input_and_option_overrides() {
        let generator = Arc::new(ScriptedTextGenerator::new("{\"type\": \"list\"}"));
        let options = json!({
            "analysis_type": "structure",
            "model": "local-small",
            "temperature": 0.2,
            "max_output_tokens": 256
        });
        let skill = skill_with(generator.clone(), options.as_object().unwrap().clone());

        let result = skill.execute(json!("- a\n- b"), &SkillContext::default()).await;

        assert!(result.success);
        assert_eq!(result.data["analysis_type"], "structure");
        let used = generator.last_options().unwrap();
        assert_eq!(used.model.as_deref(), Some("local-small"));
        assert_eq!(used.temperature, Some(0.2));
        assert_eq!(used.max_output_tokens, Some(256));
    }

    #[tokio::test]
    async fn test_missing_text_fails_before_remote_call() {
        let generator = Arc::new(ScriptedTextGenerator::new("{}"));
        let skill = skill_with(generator.clone(), Map::new());

        for input in [json!({"text": "  "}), json!(""), json!(null)] {
            let result = skill.execute(input, &SkillContext::default()).await;
            assert!(!result.success);
            assert_eq!(
                result.error.as_deref(),
                Some("skill 'analyze' requires input 'text'")
            );
        }
        assert!(generator.prompts().is_empty());
        assert_eq!(skill.status(), SkillStatus::Failed);
    }

    #[tokio::test]
    async fn test_remote_and_parse_failures_are_folded() {
        let skill = skill_with(Arc::new(ScriptedTextGenerator::failing("503 unavailable")), Map::new());
        let result = skill.execute(json!("text"), &SkillContext::default()).await;
        assert_eq!(
            result.error.as_deref(),
            Some("remote generation failed: 503 unavailable")
        );

        let skill = skill_with(Arc::new(ScriptedTextGenerator::new("I cannot help")), Map::new());
        let result = skill.execute(json!("text"), &SkillContext::default()).await;
        assert!(result.error.unwrap().starts_with("failed to parse structured output"));
        assert_eq!(result.metadata["skill"], "analyze");
    }
}
