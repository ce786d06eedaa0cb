// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context;
use futures::StreamExt;
use serde_json::{Map, Value};
use std::env;
use std::io::{self, Write};
use std::sync::Arc;
use uuid::Uuid;

use the_inkwell::config::consts::DEFAULT_LOG_DIRECTIVE;
use the_inkwell::config::{load_and_validate_config, RuntimeBuilder};
use the_inkwell::observability::init_tracing;

/// JSON objects and arrays pass through; anything else is taken as plain text.
fn parse_input(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(DEFAULT_LOG_DIRECTIVE);

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <pipeline.yaml> <input>", args[0]);
        eprintln!("Example: {} configs/local-demo.yaml \"tide pools\"", args[0]);
        eprintln!("Example: {} configs/local-demo.yaml '{{\"topic\": \"tide pools\"}}'", args[0]);
        std::process::exit(1);
    }

    let config = load_and_validate_config(&args[1])
        .with_context(|| format!("loading pipeline configuration {}", args[1]))?;
    let pipeline = Arc::new(
        RuntimeBuilder::from_config(&config)
            .with_context(|| format!("building pipeline '{}'", config.name))?,
    );

    let canceller = Arc::clone(&pipeline);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let run_id = Uuid::new_v4().to_string();
    let mut events = Arc::clone(&pipeline).run_shared(run_id, parse_input(&args[2]), Map::new());

    let mut succeeded = false;
    let mut stdout = io::stdout().lock();
    while let Some(event) = events.next().await {
        if event.is_finish() {
            succeeded = event
                .result
                .as_ref()
                .and_then(|result| result["success"].as_bool())
                .unwrap_or(false);
        }
        write!(stdout, "{}", event.to_event().to_sse())?;
        stdout.flush()?;
    }

    if !succeeded {
        std::process::exit(2);
    }
    Ok(())
}
