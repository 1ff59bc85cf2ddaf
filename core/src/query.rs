//! Nested-value query string encoding.
//!
//! Objects and arrays flatten into bracketed keys (`a[b][0]=1`). Only scalar
//! values are percent-encoded; keys are emitted as given, so callers must not
//! pass untrusted key names.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

/// Everything except the unreserved marks `- _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single query value.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Encode `value` as a query string, with every key nested under `prefix`.
///
/// A top-level call passes `None` and an object. Scalars without a prefix
/// have no key to attach to and encode as the empty string. Empty nested
/// objects contribute nothing.
pub fn encode_query(value: &Value, prefix: Option<&str>) -> String {
    let key = match (value, prefix) {
        (Value::Object(_) | Value::Array(_), _) => prefix,
        (_, None) => return String::new(),
        (_, Some(key)) => Some(key),
    };
    match value {
        Value::Null => format!("{}=", key.unwrap_or_default()),
        Value::Bool(b) => scalar(key, &b.to_string()),
        Value::Number(n) => scalar(key, &n.to_string()),
        Value::String(s) => scalar(key, s),
        Value::Object(map) => join(map.iter().map(|(k, v)| (k.clone(), v)), key),
        Value::Array(items) => join(items.iter().enumerate().map(|(i, v)| (i.to_string(), v)), key),
    }
}

fn scalar(key: Option<&str>, value: &str) -> String {
    format!("{}={}", key.unwrap_or_default(), encode_component(value))
}

fn join<'a>(entries: impl Iterator<Item = (String, &'a Value)>, prefix: Option<&str>) -> String {
    entries
        .map(|(child, v)| {
            let key = match prefix {
                Some(p) => format!("{p}[{child}]"),
                None => child,
            };
            encode_query(v, Some(&key))
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("&")
}
