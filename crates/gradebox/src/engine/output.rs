//! Output normalization and truncation
//!
//! Captured stdout/stderr and stdin-mode comparison text all pass
//! through the same normalizer: split into lines, strip trailing
//! whitespace per line, rejoin, strip trailing whitespace overall, and
//! truncate past the cap with a marker carrying the elided count.

use serde_json::Value;

/// Maximum characters of normalized output kept per stream
pub const OUTPUT_LIMIT: usize = 8192;

/// Normalize and cap a captured text stream
pub fn sanitize(text: &str) -> String {
    sanitize_with_limit(text, OUTPUT_LIMIT)
}

/// Normalize and cap at an explicit limit
pub fn sanitize_with_limit(text: &str, limit: usize) -> String {
    let cleaned = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let cleaned = cleaned.trim_end();

    // Character count, not byte length: the cap is a display budget
    let total = cleaned.chars().count();
    if total <= limit {
        return cleaned.to_string();
    }

    let kept: String = cleaned.chars().take(limit).collect();
    format!("{kept}... [truncated {} chars]", total - limit)
}

/// Render a JSON value the way Python's `str()` renders the decoded
/// object, for stdin-mode text comparison. A null expectation renders
/// empty, matching the normalizer's treatment of a missing value.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => python_repr(value),
    }
}

/// Python `repr()` of a JSON-decoded object. Containers render their
/// elements with repr, so strings gain single quotes.
fn python_repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(python_repr).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(key, val)| format!("'{}': {}", key, python_repr(val)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}
