// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::batch::decode_base64_artifact;
use crate::errors::SkillError;
use crate::skills::{diagnose, TextDefaults};
use crate::traits::{Skill, SkillContext, SkillCore, SkillOptions, SkillResult, TextGenerator};

const DEFAULTS: TextDefaults = TextDefaults {
    model: "gemini-2.0-flash-exp",
    temperature: 1.0,
    max_output_tokens: 8000,
};

const DEFAULT_PROMPT: &str = "Write an illustrated post outline for the topic below.\n\
Separate pages with <page> and start each page with a tag: [cover] for the first page, \
[content] for body pages and [summary] for the closing page.\n\n\
Topic:\n{topic}";

static PAGE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<page>").expect("page separator pattern"));
static PAGE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(\S+)\]").expect("page tag pattern"));

/// One page of a parsed outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlinePage {
    pub index: usize,
    #[serde(rename = "type")]
    pub category: String,
    pub content: String,
}

fn page_category(tag: &str) -> &'static str {
    match tag.to_lowercase().as_str() {
        "cover" | "封面" => "cover",
        "summary" | "总结" => "summary",
        _ => "content",
    }
}

/// Split outline text into pages.
///
/// Pages are separated by `<page>` (any case) or, when no such marker exists, by
/// `---`. Blank pages are dropped and the rest are numbered from zero. A leading
/// `[tag]` selects the page category; the page content keeps the tag.
pub fn parse_outline(text: &str) -> Vec<OutlinePage> {
    let chunks: Vec<&str> = if PAGE_SEPARATOR.is_match(text) {
        PAGE_SEPARATOR.split(text).collect()
    } else {
        text.split("---").collect()
    };

    chunks
        .into_iter()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .enumerate()
        .map(|(index, chunk)| OutlinePage {
            index,
            category: PAGE_TAG
                .captures(chunk)
                .map(|caps| page_category(&caps[1]))
                .unwrap_or("content")
                .to_string(),
            content: chunk.to_string(),
        })
        .collect()
}

/// Topic to page outline through the text generator.
///
/// Input is `{"topic": ..., "images": [base64...]}` or a bare topic string. The
/// output is shaped to feed the batch generation skill directly.
pub struct OutlineSkill {
    core: SkillCore,
    text: Arc<dyn TextGenerator>,
}

impl OutlineSkill {
    pub const KIND: &'static str = "outline";

    pub fn new(name: impl Into<String>, options: SkillOptions, text: Arc<dyn TextGenerator>) -> Self {
        Self {
            core: SkillCore::new(name, "2.0.0")
                .with_description("Turn a topic into a page-by-page outline")
                .with_options(options),
            text,
        }
    }

    fn prompt(&self, topic: &str, image_count: usize) -> String {
        let template = self.core.option_str("prompt_template").unwrap_or(DEFAULT_PROMPT);
        let mut prompt = template.replace("{topic}", topic);
        if image_count > 0 {
            prompt.push_str(&format!(
                "\n\nNote: the user supplied {} reference image(s); reflect their content and style in the outline.",
                image_count
            ));
        }
        prompt
    }
}

#[async_trait]
impl Skill for OutlineSkill {
    fn core(&self) -> &SkillCore {
        &self.core
    }

    fn required_inputs(&self) -> &[&'static str] {
        &["topic"]
    }

    async fn run(&self, input: Value, _context: &SkillContext) -> Result<SkillResult, SkillError> {
        let (topic, encoded_images): (&str, Vec<&str>) = match &input {
            Value::String(topic) => (topic.as_str(), Vec::new()),
            Value::Object(map) => (
                map.get("topic").and_then(Value::as_str).unwrap_or_default(),
                map.get("images")
                    .and_then(Value::as_array)
                    .map(|images| images.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default(),
            ),
            _ => ("", Vec::new()),
        };
        if topic.trim().is_empty() {
            return Err(SkillError::MissingInput {
                skill: self.name().to_string(),
                input: "topic".to_string(),
            });
        }

        let images = encoded_images
            .iter()
            .enumerate()
            .map(|(position, encoded)| {
                decode_base64_artifact(encoded).map_err(|e| {
                    SkillError::InvalidInput(format!("image {} is not valid base64: {}", position, e))
                })
            })
            .collect::<Result<Vec<Bytes>, _>>()?;

        let mut options = DEFAULTS.resolve(&self.core);
        let prompt = self.prompt(topic, images.len());
        let has_images = !images.is_empty();
        options.references = images;

        let outline = self
            .text
            .generate_text(&prompt, &options)
            .await
            .map_err(|err| diagnose(err, "outline generation failed"))?;
        let pages = parse_outline(&outline);
        let page_count = pages.len();

        Ok(SkillResult::ok(json!({
            "outline": outline,
            "pages": pages,
            "has_images": has_images,
            "topic": topic,
        }))
        .with_metadata("skill", self.name())
        .with_metadata("model", options.model.unwrap_or_default())
        .with_metadata("page_count", page_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::ScriptedTextGenerator;
    use serde_json::Map;

    fn skill_with(generator: Arc<ScriptedTextGenerator>) -> OutlineSkill {
        OutlineSkill::new("outline", Map::new(), generator)
    }

    #[test]
    fn test_parse_page_markers() {
        let text = "<page>[cover] Tide pools\n<PAGE>\n[content] Anemones\n<page>[summary] Go look\n<page>  ";
        let pages = parse_outline(text);

        assert_eq!(pages.len(), 3);
        assert_eq!(
            pages.iter().map(|p| p.category.as_str()).collect::<Vec<_>>(),
            vec!["cover", "content", "summary"]
        );
        assert_eq!(pages.iter().map(|p| p.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(pages[1].content, "[content] Anemones");
    }

    #[test]
    fn test_parse_dash_separators_and_tags() {
        let pages = parse_outline("[封面] Title\n---\nUntagged body\n---\n[sidebar] extra\n---\n[总结] End");

        assert_eq!(
            pages.iter().map(|p| p.category.as_str()).collect::<Vec<_>>(),
            vec!["cover", "content", "content", "summary"]
        );
    }

    #[test]
    fn test_unseparated_text_is_one_page() {
        let pages = parse_outline("just one idea");
        assert_eq!(pages, vec![OutlinePage {
            index: 0,
            category: "content".into(),
            content: "just one idea".into(),
        }]);
    }

    #[tokio::test]
    async fn test_outline_output_feeds_batch_input() {
        let generator = Arc::new(ScriptedTextGenerator::new(
            "[cover] Tide pools<page>[content] Crabs<page>[summary] Visit",
        ));
        let skill = skill_with(generator.clone());

        let result = skill
            .execute(json!({"topic": "tide pools"}), &SkillContext::default())
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.metadata["page_count"], 3);
        assert_eq!(result.data["has_images"], false);
        assert!(generator.prompts()[0].ends_with("tide pools"));

        let batch: crate::batch::BatchInput = serde_json::from_value(result.data).unwrap();
        assert_eq!(batch.tasks.len(), 3);
        assert_eq!(batch.tasks[0].category, "cover");
        assert_eq!(batch.topic, "tide pools");
        assert!(batch.outline.contains("<page>"));
    }

    #[tokio::test]
    async fn test_images_are_forwarded_as_references() {
        let generator = Arc::new(ScriptedTextGenerator::new("[cover] x"));
        let skill = skill_with(generator.clone());

        let result = skill
            .execute(
                json!({"topic": "cats", "images": ["data:image/png;base64,aGVsbG8="]}),
                &SkillContext::default(),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.data["has_images"], true);
        assert!(generator.prompts()[0].contains("1 reference image"));
        assert_eq!(
            generator.last_options().unwrap().references,
            vec![Bytes::from_static(b"hello")]
        );
    }

    #[tokio::test]
    async fn test_invalid_image_is_rejected() {
        let generator = Arc::new(ScriptedTextGenerator::new("[cover] x"));
        let skill = skill_with(generator.clone());

        let result = skill
            .execute(json!({"topic": "cats", "images": ["***"]}), &SkillContext::default())
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("invalid input: image 0"));
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_remote_errors_are_classified() {
        let test_cases = vec![
            ("401 invalid api_key", "authentication failed"),
            ("404 no such model", "model unavailable"),
            ("429 rate limited", "quota exhausted"),
            ("connection reset", "outline generation failed"),
        ];

        for (remote, expected) in test_cases {
            let skill = skill_with(Arc::new(ScriptedTextGenerator::failing(remote)));
            let result = skill.execute(json!("topic"), &SkillContext::default()).await;

            let error = result.error.unwrap();
            assert!(error.starts_with(expected), "{}: {}", remote, error);
            assert!(error.contains(remote), "{}", remote);
        }
    }

    #[tokio::test]
    async fn test_custom_prompt_template() {
        let generator = Arc::new(ScriptedTextGenerator::new("[cover] x"));
        let options = json!({"prompt_template": "Outline: {topic}!"});
        let skill = OutlineSkill::new("outline", options.as_object().unwrap().clone(), generator.clone());

        skill.execute(json!("otters"), &SkillContext::default()).await;

        assert_eq!(generator.prompts(), vec!["Outline: otters!".to_string()]);
    }
}
