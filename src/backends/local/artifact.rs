// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::batch::GenerationRequest;
use crate::errors::GenerationError;
use crate::traits::ArtifactGenerator;

const DEFAULT_WIDTH: u64 = 768;
const DEFAULT_HEIGHT: u64 = 1024;

/// Offline artifact backend rendering each task as a labelled SVG card.
#[derive(Debug, Clone)]
pub struct SvgPlaceholderGenerator {
    width: u64,
    height: u64,
}

impl Default for SvgPlaceholderGenerator {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl SvgPlaceholderGenerator {
    pub fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }

    pub fn from_options(options: &Map<String, Value>) -> Self {
        Self {
            width: options
                .get("width")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_WIDTH),
            height: options
                .get("height")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_HEIGHT),
        }
    }

    fn render(&self, request: &GenerationRequest, reference: Option<&Bytes>) -> String {
        let lines: String = request
            .task
            .spec
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(12)
            .enumerate()
            .map(|(i, line)| {
                format!(
                    "  <text x=\"32\" y=\"{}\" font-size=\"22\">{}</text>\n",
                    120 + i * 32,
                    escape_xml(line.trim())
                )
            })
            .collect();

        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n\
             <!-- task {index} ({category}), reference: {reference} bytes, user references: {users} -->\n\
             \x20 <rect width=\"100%\" height=\"100%\" fill=\"#fdf6e3\"/>\n\
             \x20 <text x=\"32\" y=\"64\" font-size=\"32\" font-weight=\"bold\">{category} #{index}</text>\n\
             {lines}</svg>\n",
            w = self.width,
            h = self.height,
            index = request.task.index,
            category = escape_xml(&request.task.category),
            reference = reference.map(Bytes::len).unwrap_or(0),
            users = request.user_references.len(),
            lines = lines,
        )
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl ArtifactGenerator for SvgPlaceholderGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
        reference: Option<&Bytes>,
    ) -> Result<Bytes, GenerationError> {
        Ok(Bytes::from(self.render(request, reference)))
    }

    fn file_extension(&self) -> &str {
        "svg"
    }

    fn name(&self) -> &'static str {
        "svg_placeholder"
    }
}
