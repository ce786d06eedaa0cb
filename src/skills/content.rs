// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::errors::SkillError;
use crate::skills::{diagnose, parse::extract_json, TextDefaults};
use crate::traits::{Skill, SkillContext, SkillCore, SkillOptions, SkillResult, TextGenerator};

const DEFAULTS: TextDefaults = TextDefaults {
    model: "gemini-2.0-flash-exp",
    temperature: 1.0,
    max_output_tokens: 4000,
};

const DEFAULT_PROMPT: &str = "Write candidate titles, the post copy and hashtags for an \
illustrated post.\n\nTopic: {topic}\nOutline:\n{outline}\n\n\
Respond with JSON: {\"titles\": [\"title 1\", \"title 2\"], \"copywriting\": \"post copy\", \
\"tags\": [\"tag 1\", \"tag 2\"]}";

/// Titles, copy and tags written for a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostCopy {
    pub titles: Vec<String>,
    pub copywriting: String,
    pub tags: Vec<String>,
}

impl PostCopy {
    /// Normalize a model reply. A single title string becomes a one-item list and
    /// a comma-separated tag string is split.
    fn from_reply(reply: &Value) -> Self {
        let titles = match reply.get("titles") {
            Some(Value::String(title)) => vec![title.clone()],
            Some(Value::Array(items)) => strings(items),
            _ => Vec::new(),
        };
        let tags = match reply.get("tags") {
            Some(Value::String(tags)) => tags
                .split([',', '，'])
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::Array(items)) => strings(items),
            _ => Vec::new(),
        };
        Self {
            titles,
            copywriting: reply
                .get("copywriting")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            tags,
        }
    }
}

fn strings(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Topic and outline to post copy through the text generator.
///
/// Input is the outline skill's output (or any object with `topic` and
/// `outline`). The input object passes through with `titles`, `copywriting` and
/// `tags` added, so a following batch step still sees its pages.
pub struct ContentSkill {
    core: SkillCore,
    text: Arc<dyn TextGenerator>,
}

impl ContentSkill {
    pub const KIND: &'static str = "content";

    pub fn new(name: impl Into<String>, options: SkillOptions, text: Arc<dyn TextGenerator>) -> Self {
        Self {
            core: SkillCore::new(name, "2.0.0")
                .with_description("Write titles, copy and tags for a post")
                .with_options(options),
            text,
        }
    }

    fn prompt(&self, topic: &str, outline: &str) -> String {
        self.core
            .option_str("prompt_template")
            .unwrap_or(DEFAULT_PROMPT)
            .replace("{topic}", topic)
            .replace("{outline}", outline)
    }
}

#[async_trait]
impl Skill for ContentSkill {
    fn core(&self) -> &SkillCore {
        &self.core
    }

    fn required_inputs(&self) -> &[&'static str] {
        &["topic", "outline"]
    }

    async fn run(&self, input: Value, _context: &SkillContext) -> Result<SkillResult, SkillError> {
        let Value::Object(mut fields) = input else {
            return Err(SkillError::InvalidInput(
                "content needs an object with topic and outline".to_string(),
            ));
        };
        let field = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or_else(|| SkillError::MissingInput {
                    skill: self.name().to_string(),
                    input: name.to_string(),
                })
        };
        let topic = field("topic")?;
        let outline = field("outline")?;

        let options = DEFAULTS.resolve(&self.core);
        let reply = self
            .text
            .generate_text(&self.prompt(&topic, &outline), &options)
            .await
            .map_err(|err| diagnose(err, "content generation failed"))?;
        let copy = PostCopy::from_reply(&extract_json(self.name(), &reply)?);

        let (title_count, tag_count) = (copy.titles.len(), copy.tags.len());
        if let Value::Object(written) = serde_json::to_value(copy)
            .map_err(|e| SkillError::InvalidInput(format!("unserializable copy: {}", e)))?
        {
            fields.extend(written);
        }

        Ok(SkillResult::ok(Value::Object(fields))
            .with_metadata("skill", self.name())
            .with_metadata("model", options.model.unwrap_or_default())
            .with_metadata("title_count", title_count)
            .with_metadata("tag_count", tag_count))
    }
}
