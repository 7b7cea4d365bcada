//! Embedded payload extraction
//!
//! The source's server renderer streams its page data as a series of inline
//! script calls of the form `self.__next_f.push([1,"<escaped text>"])`. Each
//! call carries one escaped piece of a larger text buffer. This module
//! reassembles that buffer and carves a single JSON object out of it:
//!
//! 1. collect every fragment in document order
//! 2. decode the string escapes of each fragment
//! 3. concatenate the decoded fragments
//! 4. find the anchor key, walk back to the `{` that encloses it
//! 5. walk forward counting brace depth until the object closes
//! 6. parse the carved text as JSON
//!
//! Both scans skip over string literals, so braces inside values do not
//! affect the depth count.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

/// Why the structured path could not produce an object
///
/// Every variant means the same thing to callers: fall back to metadata.
#[derive(Debug, Error)]
pub enum EmbeddedError {
    #[error("no streamed payload fragments found in page")]
    MarkerNotFound,

    #[error("anchor key '{0}' not found in payload")]
    KeyNotFound(String),

    #[error("object enclosing '{0}' is not balanced")]
    Unbalanced(String),

    #[error("carved object is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

static FRAGMENT_RE: OnceLock<Regex> = OnceLock::new();

fn fragment_regex() -> &'static Regex {
    FRAGMENT_RE.get_or_init(|| {
        Regex::new(r#"(?s)self\.__next_f\.push\(\[\s*\d+\s*,\s*"((?:[^"\\]|\\.)*)"\s*\]\)"#)
            .unwrap()
    })
}

/// Decodes one streamed fragment
///
/// Handles escaped newlines, quotes and backslashes in a single left-to-right
/// pass: a backslash always consumes the character after it, so the output of
/// one escape is never read as the start of another. Unknown escapes are kept
/// as-is for the JSON parser to interpret.
pub fn unescape_fragment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Encodes text the way the source escapes a streamed fragment
///
/// Inverse of [`unescape_fragment`] for text made of plain characters,
/// quotes, backslashes and newlines.
pub fn escape_fragment(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// Collects and concatenates every streamed fragment in discovery order
///
/// Returns `None` if the page carries no fragments at all.
pub fn reconstruct_payload(html: &str) -> Option<String> {
    let mut buffer = String::new();
    let mut found = false;

    for caps in fragment_regex().captures_iter(html) {
        if let Some(piece) = caps.get(1) {
            buffer.push_str(&unescape_fragment(piece.as_str()));
            found = true;
        }
    }

    found.then_some(buffer)
}

/// Returns true if the byte at `pos` is preceded by an odd number of backslashes
fn is_escaped(bytes: &[u8], pos: usize) -> bool {
    let mut count = 0;
    let mut i = pos;
    while i > 0 && bytes[i - 1] == b'\\' {
        count += 1;
        i -= 1;
    }
    count % 2 == 1
}

/// Byte offsets of every `"key"` that is used as an object key
fn anchor_positions(buffer: &str, key: &str) -> Vec<usize> {
    let needle = format!("\"{}\"", key);
    let bytes = buffer.as_bytes();

    buffer
        .match_indices(&needle)
        .map(|(pos, _)| pos)
        .filter(|&pos| {
            bytes[pos + needle.len()..]
                .iter()
                .find(|b| !b.is_ascii_whitespace())
                == Some(&b':')
        })
        .collect()
}

/// Walks backward from `key_pos` to the `{` of the object containing it
fn enclosing_object_start(buffer: &str, key_pos: usize) -> Option<usize> {
    let bytes = buffer.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = key_pos;

    while i > 0 {
        i -= 1;
        let b = bytes[i];

        if b == b'"' && !is_escaped(bytes, i) {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }

        match b {
            b'}' => depth += 1,
            b'{' if depth == 0 => return Some(i),
            b'{' => depth -= 1,
            _ => {}
        }
    }

    None
}

/// Walks forward from the `{` at `start` to one past its matching `}`
fn object_end(buffer: &str, start: usize) -> Option<usize> {
    let bytes = buffer.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Carves the text of the object enclosing the anchor at `key_pos`
fn carve_at<'a>(buffer: &'a str, key_pos: usize, key: &str) -> Result<&'a str, EmbeddedError> {
    let start = enclosing_object_start(buffer, key_pos)
        .ok_or_else(|| EmbeddedError::Unbalanced(key.to_string()))?;
    let end =
        object_end(buffer, start).ok_or_else(|| EmbeddedError::Unbalanced(key.to_string()))?;
    Ok(&buffer[start..end])
}

/// Carves the first object containing `key` out of an already decoded buffer
pub fn carve_object<'a>(buffer: &'a str, key: &str) -> Result<&'a str, EmbeddedError> {
    let key_pos = *anchor_positions(buffer, key)
        .first()
        .ok_or_else(|| EmbeddedError::KeyNotFound(key.to_string()))?;
    carve_at(buffer, key_pos, key)
}

/// Extracts the object enclosing `key` from the page's streamed payload
///
/// Anchors are tried in order; the first one whose enclosing object parses is
/// returned. When none parse, the error from the last attempt is returned.
///
/// # Example
///
/// ```
/// use zighang_sync::extract::extract_embedded_object;
///
/// let html = r#"<script>self.__next_f.push([1,"{\"title\":\"Backend\",\"employeeTypes\":[\"FULL_TIME\"]}"])</script>"#;
/// let object = extract_embedded_object(html, "employeeTypes").unwrap();
/// assert_eq!(object["title"], "Backend");
/// ```
pub fn extract_embedded_object(html: &str, key: &str) -> Result<Value, EmbeddedError> {
    let buffer = reconstruct_payload(html).ok_or(EmbeddedError::MarkerNotFound)?;
    extract_from_payload(&buffer, key)
}

/// Same as [`extract_embedded_object`] for an already reconstructed buffer
pub fn extract_from_payload(buffer: &str, key: &str) -> Result<Value, EmbeddedError> {
    let positions = anchor_positions(buffer, key);
    if positions.is_empty() {
        return Err(EmbeddedError::KeyNotFound(key.to_string()));
    }

    let mut last_error = None;
    for key_pos in positions {
        let attempt = carve_at(buffer, key_pos, key)
            .and_then(|text| serde_json::from_str::<Value>(text).map_err(EmbeddedError::from));
        match attempt {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::trace!("Anchor at byte {} rejected: {}", key_pos, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| EmbeddedError::KeyNotFound(key.to_string())))
}
