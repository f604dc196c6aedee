use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde_json::{json, Map, Value};

/// Keys whose values carry device or path-level detail the analysis never
/// needs.
const REDACTED_KEYS: [&str; 4] = ["transitPath", "simplifiedRawPath", "deviceTag", "placeId"];

const REDACTED_SUFFIX: &str = "_redacted.json";

/// Strip sensitive detail from an export tree, returning a new tree. Redacted
/// keys become the literal `"REDACTED"`; E7 coordinate fields are scaled down
/// to two-decimal degrees so the rough area survives but the address does
/// not. Arrays and nested objects are walked recursively; the input is never
/// mutated, so sharing sub-structure between callers is safe.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::with_capacity(map.len());
            for (key, child) in map {
                let new_child = if REDACTED_KEYS.contains(&key.as_str()) {
                    Value::String("REDACTED".to_string())
                } else if key.contains("E7") {
                    coarsen_coordinate(key, child)
                } else {
                    redact_value(child)
                };
                redacted.insert(key.clone(), new_child);
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        scalar => scalar.clone(),
    }
}

fn coarsen_coordinate(key: &str, value: &Value) -> Value {
    match value.as_i64() {
        Some(raw) => {
            if raw.abs().to_string().len() != 9 {
                warn!("coordinate field '{key}' has unexpected magnitude: {raw}");
            }
            let coarse = (raw as f64 * 1e-7 * 100.0).round() / 100.0;
            json!(coarse)
        }
        // Already low-resolution (a previously redacted file); pass through.
        None => value.clone(),
    }
}

/// Keep only the timeline objects that describe movement segments; place
/// visits and other object kinds are dropped wholesale.
pub fn select_activity_segments(value: &Value) -> Vec<Value> {
    let objects = match value {
        Value::Object(map) => map
            .get("timelineObjects")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    };

    objects
        .into_iter()
        .filter(|object| {
            object
                .as_object()
                .is_some_and(|map| map.contains_key("activitySegment"))
        })
        .collect()
}

/// Redact one export file into a `<stem>_redacted.json` sibling. Inputs that
/// are themselves redacted outputs are refused so repeated runs cannot
/// re-scale coordinates.
pub fn redact_file(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("'{}' has no usable file name", path.display()))?;
    if file_name.ends_with(REDACTED_SUFFIX) {
        bail!("'{}' is already a redacted file", path.display());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let parsed: Value = serde_json::from_str(&contents)
        .with_context(|| format!("'{}' is not valid JSON", path.display()))?;

    let redacted: Vec<Value> = select_activity_segments(&parsed)
        .iter()
        .map(redact_value)
        .collect();

    let output_path = path.with_file_name(format!(
        "{}{}",
        file_name.trim_end_matches(".json"),
        REDACTED_SUFFIX
    ));
    let serialized = serde_json::to_string_pretty(&Value::Array(redacted))?;
    std::fs::write(&output_path, serialized)
        .with_context(|| format!("failed to write '{}'", output_path.display()))?;

    info!("Redacted file created: {}", output_path.display());
    Ok(output_path)
}
