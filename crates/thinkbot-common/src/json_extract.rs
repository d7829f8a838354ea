//! Recover a JSON object from model output that may be wrapped in prose,
//! markdown fences, or trailing commentary.
//!
//! Strategy, first hit wins:
//! 1. the trimmed text parsed directly
//! 2. the greedy span from the first `{` to the last `}`
//! 3. each balanced `{...}` span, scanning left to right

use serde_json::{Map, Value};

use crate::error::GatewayError;

pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, GatewayError> {
    let trimmed = text.trim();

    if let Some(obj) = parse_object(trimmed) {
        return Ok(obj);
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Some(obj) = parse_object(&trimmed[start..=end]) {
                return Ok(obj);
            }
        }
    }

    let mut from = 0;
    while let Some(offset) = trimmed[from..].find('{') {
        let start = from + offset;
        if let Some(end) = balanced_end(trimmed, start) {
            if let Some(obj) = parse_object(&trimmed[start..=end]) {
                return Ok(obj);
            }
        }
        from = start + 1;
    }

    Err(GatewayError::MalformedResponse(
        "No valid JSON found in response".to_string(),
    ))
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Byte index of the `}` closing the brace at `start`, ignoring braces inside strings.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}
