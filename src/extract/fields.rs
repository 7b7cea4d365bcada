//! Lenient accessors over loosely typed JSON
//!
//! Page payloads are undocumented and drift over time: a list may arrive as a
//! single string, a number as a numeric string, and missing values as `null`
//! or the streaming placeholder `"$undefined"`. These helpers absorb that.

use serde_json::Value;

const UNDEFINED: &str = "$undefined";

/// Non-blank string value of `value`, if it is one
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == UNDEFINED {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-blank string found under any of `keys`
pub fn text(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| object.get(*key).and_then(as_text))
}

/// String at a nested path such as `["company", "name"]`
pub fn text_at(object: &Value, path: &[&str]) -> Option<String> {
    let mut current = object;
    for key in path {
        current = current.get(*key)?;
    }
    as_text(current)
}

/// Strings under `key`
///
/// Accepts an array of strings, an array of objects carrying `name`, or a
/// single string.
pub fn text_list(object: &Value, key: &str) -> Vec<String> {
    match object.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(_) => text(item, &["name", "label", "value"]),
                other => as_text(other),
            })
            .collect(),
        Some(single) => as_text(single).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Non-negative integer under any of `keys`; numeric strings are accepted
pub fn number(object: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

/// Drops duplicates while keeping first-seen order
pub fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}
