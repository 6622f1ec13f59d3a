//! Composite key encoding.
//!
//! Components are joined with `/`. Inside a component `%`, `/` and NUL are
//! percent-escaped, so distinct tuples never collide. `uint64` values are
//! zero-padded to 20 digits, which makes byte order match numeric order;
//! the access log relies on this for insertion-ordered scans. An empty
//! component encodes as a lone `%`, which escaping never produces.

use super::value::Value;

/// Encode one component.
pub(crate) fn encode_component(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => escape(s),
        Value::Bool(b) => b.to_string(),
        Value::Bytes(b) => hex::encode(b),
        Value::Int64(n) => n.to_string(),
        Value::Uint64(n) => format!("{n:020}"),
    };
    if raw.is_empty() { "%".to_owned() } else { raw }
}

/// Encode a tuple of components.
pub(crate) fn encode<'a>(values: impl IntoIterator<Item = &'a Value>) -> String {
    values
        .into_iter()
        .map(encode_component)
        .collect::<Vec<_>>()
        .join("/")
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '\0' => out.push_str("%00"),
            other => out.push(other),
        }
    }
    out
}
