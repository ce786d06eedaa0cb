// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Recovering JSON from free-form model output.
//!
//! Strategies are tried in order: the whole text, the first fenced code block,
//! then the span from the first `{` to the last `}`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::errors::SkillError;
use crate::observability::messages::skill::StructuredOutputRecovered;
use crate::observability::messages::StructuredLog;

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").expect("fenced block pattern"));

fn fenced_block(text: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Extract a JSON value from model output on behalf of `skill`.
pub fn extract_json(skill: &str, text: &str) -> Result<Value, SkillError> {
    if let Ok(value) = serde_json::from_str(text.trim()) {
        return Ok(value);
    }

    let fallbacks: [(&str, fn(&str) -> Option<&str>); 2] =
        [("fenced block", fenced_block), ("brace scan", brace_span)];
    for (strategy, candidate) in fallbacks {
        if let Some(value) = candidate(text).and_then(|c| serde_json::from_str(c).ok()) {
            StructuredOutputRecovered { skill, strategy }.log();
            return Ok(value);
        }
    }

    Err(SkillError::Parse(format!(
        "no JSON object found in {} characters of output",
        text.chars().count()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extraction_strategies() {
        let test_cases = vec![
            ("direct", r#"{"a": 1}"#, json!({"a": 1})),
            ("direct array", "[1, 2]", json!([1, 2])),
            (
                "fenced json",
                "Here you go:\n```json\n{\"a\": 2}\n```\nEnjoy.",
                json!({"a": 2}),
            ),
            ("fenced bare", "```\n{\"a\": 3}\n```", json!({"a": 3})),
            (
                "brace scan",
                "Sure! The answer is {\"a\": {\"b\": 4}} as requested.",
                json!({"a": {"b": 4}}),
            ),
        ];

        for (name, text, expected) in test_cases {
            let value = extract_json("analyze", text).unwrap_or_else(|e| panic!("{}: {}", name, e));
            assert_eq!(value, expected, "{}", name);
        }
    }

    #[test]
    fn test_broken_fence_falls_through_to_brace_scan() {
        let text = "```json\nnot json\n```\nbut later {\"ok\": true}";
        // The brace scan starts at the first '{', which is the trailing object.
        assert_eq!(extract_json("analyze", text).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_unparseable_output() {
        let err = extract_json("analyze", "no structure here").unwrap_err();
        assert!(matches!(err, SkillError::Parse(_)));

        let err = extract_json("analyze", "} backwards {").unwrap_err();
        assert!(matches!(err, SkillError::Parse(_)));
    }
}
