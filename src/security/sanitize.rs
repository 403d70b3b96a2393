//! Recursive neutralization of HTML-significant characters.
//!
//! Defense in depth against stored/reflected injection when downstream
//! consumers render these values without their own escaping. Not a
//! substitute for parameterized queries.
//!
//! The ampersand is deliberately left alone, which makes sanitization
//! idempotent: escaped entities contain no characters from the escape set.

use serde_json::Value;

/// Escape `< > " ' /` and trim surrounding whitespace.
pub fn sanitize_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.trim().chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

/// Walk arrays and maps recursively, sanitizing every string leaf.
/// Non-string, non-container values pass through unchanged.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (sanitize_str(&k), sanitize_value(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Sanitize a raw query string, preserving pair structure.
pub fn sanitize_query(query: &str) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        serializer.append_pair(&sanitize_str(&key), &sanitize_str(&value));
    }
    serializer.finish()
}
