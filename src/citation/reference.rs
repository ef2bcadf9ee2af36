//! Reference bundle decoding.
//!
//! The bundle is an ordered array with one element per assistant turn. It
//! arrives either JSON-encoded inside a string or already inline. Elements
//! come in two shapes: `{ "documents": [...] }` and the backend's native
//! `{ "chatid", "reference": [...] }`.

use super::types::{RagReference, ReferenceEntry};
use serde_json::Value;

/// Decode a string-encoded bundle. Never fails: an absent, blank or
/// undecodable bundle is an empty list.
pub fn parse_reference_bundle(raw: Option<&str>) -> Vec<ReferenceEntry> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => parse_reference_value(&value),
        Err(e) => {
            tracing::warn!(target: "ragstream::citation", err=%e, "reference bundle is not valid JSON, ignoring it");
            Vec::new()
        }
    }
}

/// Decode an already parsed bundle.
///
/// A malformed or `null` element becomes an empty entry so that later
/// elements keep their positions.
pub fn parse_reference_value(value: &Value) -> Vec<ReferenceEntry> {
    match value {
        Value::Null => Vec::new(),
        // Double-encoded: a JSON string holding the array.
        Value::String(inner) => parse_reference_bundle(Some(inner)),
        Value::Array(items) => items.iter().map(entry_from_value).collect(),
        other => {
            tracing::warn!(
                target: "ragstream::citation",
                kind = value_kind(other),
                "reference bundle is not an array, ignoring it"
            );
            Vec::new()
        }
    }
}

fn entry_from_value(value: &Value) -> ReferenceEntry {
    let Value::Object(map) = value else {
        if !value.is_null() {
            tracing::debug!(target: "ragstream::citation", kind = value_kind(value), "non-object reference element");
        }
        return ReferenceEntry::default();
    };

    let decoded = if map.contains_key("documents") {
        serde_json::from_value::<ReferenceEntry>(value.clone())
    } else if map.contains_key("reference") {
        serde_json::from_value::<RagReference>(value.clone()).map(|r| r.to_entry())
    } else {
        Ok(ReferenceEntry::default())
    };

    decoded.unwrap_or_else(|e| {
        tracing::debug!(target: "ragstream::citation", err=%e, "malformed reference element");
        ReferenceEntry::default()
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
