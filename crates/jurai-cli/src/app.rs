use anyhow::{bail, Context, Result};
use jurai_core::{BridgeItem, EventBridge, Settings};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use crate::render::{render_event, render_report};

/// Read a screening context. A file holding a list yields its first element.
pub fn load_context(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read context file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("context file {} is not valid JSON", path.display()))?;

    match value {
        Value::Array(mut items) => {
            if items.is_empty() {
                bail!("context file {} holds an empty list", path.display());
            }
            Ok(items.swap_remove(0))
        }
        Value::Object(_) => Ok(value),
        _ => bail!("context file {} must hold an object or a list of objects", path.display()),
    }
}

/// Run one screening, streaming progress to stderr and the result to stdout.
pub async fn run_screening(settings: &Settings, context: Value, json: bool) -> Result<()> {
    let runner = Arc::new(settings.build_runner()?);
    tracing::info!(
        "Screening with up to {} critique round(s)",
        settings.deliberation.max_iterations
    );

    let mut run = EventBridge::spawn(move |sink| async move { runner.run(&context, &sink).await });

    let report = loop {
        match run.next().await {
            Some(BridgeItem::Event(event)) => {
                if let Some(line) = render_event(&event) {
                    eprintln!("{line}");
                }
            }
            Some(BridgeItem::Finished(result)) => break result??,
            None => bail!("screening ended without a result"),
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_report(&report));
    }
    Ok(())
}
