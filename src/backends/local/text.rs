// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::GenerationError;
use crate::traits::{TextGenerator, TextOptions};

/// Offline text backend.
///
/// Answers with the first entry of `replies` whose `when` text occurs in the
/// prompt, else the configured `response`, else the prompt itself. Useful for
/// demos and for exercising pipelines without a remote service.
#[derive(Debug, Clone, Default)]
pub struct EchoTextGenerator {
    response: Option<String>,
    replies: Vec<(String, String)>,
}

impl EchoTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            replies: Vec::new(),
        }
    }

    /// Answer prompts containing `when` with `response`. Earlier replies win.
    pub fn with_reply(mut self, when: impl Into<String>, response: impl Into<String>) -> Self {
        self.replies.push((when.into(), response.into()));
        self
    }

    pub fn from_options(options: &Map<String, Value>) -> Self {
        let replies = options
            .get("replies")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let when = entry.get("when")?.as_str()?;
                        let response = entry.get("response")?.as_str()?;
                        Some((when.to_string(), response.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            response: options
                .get("response")
                .and_then(Value::as_str)
                .map(str::to_string),
            replies,
        }
    }
}

#[async_trait]
impl TextGenerator for EchoTextGenerator {
    async fn generate_text(
        &self,
        prompt: &str,
        _options: &TextOptions,
    ) -> Result<String, GenerationError> {
        let reply = self
            .replies
            .iter()
            .find(|(when, _)| prompt.contains(when.as_str()))
            .map(|(_, response)| response)
            .or(self.response.as_ref());
        Ok(reply.cloned().unwrap_or_else(|| prompt.to_string()))
    }

    fn name(&self) -> &'static str {
        "echo_text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_echoes_prompt_without_response() {
        let generator = EchoTextGenerator::new();
        let text = generator
            .generate_text("hello", &TextOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_configured_response_wins() {
        let options = json!({"response": "[cover] Title"});
        let generator = EchoTextGenerator::from_options(options.as_object().unwrap());
        let text = generator
            .generate_text("ignored", &TextOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "[cover] Title");
    }

    #[tokio::test]
    async fn test_replies_match_on_prompt_text() {
        let options = json!({
            "response": "fallback",
            "replies": [
                {"when": "copywriting", "response": "{\"titles\": []}"},
                {"when": "copy", "response": "shadowed"},
                {"when": 3}
            ]
        });
        let generator = EchoTextGenerator::from_options(options.as_object().unwrap());

        let text = generator
            .generate_text("return titles and copywriting", &TextOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "{\"titles\": []}");

        let text = generator
            .generate_text("outline please", &TextOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "fallback");

        let generator = EchoTextGenerator::new().with_reply("page", "[cover] x");
        let text = generator
            .generate_text("no match", &TextOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "no match");
    }
}
