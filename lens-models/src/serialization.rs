// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Canonical JSON serialization.
//!
//! Model inputs are arbitrary JSON values; fingerprinting requires a
//! byte-stable rendition of them. `canonical_json` writes a compact JSON
//! string with all object keys sorted recursively, so that two inputs that
//! are equal as JSON values always serialize to identical bytes.

use serde_json::Value;
use std::collections::BTreeMap;

/// Renders a JSON value in canonical form: compact, object keys sorted
/// recursively at every nesting level. Arrays keep their order (order is
/// significant in JSON arrays).
pub fn canonical_json(value: &Value) -> String {
    canonicalize(value).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<_, _> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            // rebuilt from a BTreeMap so key order stays sorted even if
            // serde_json's `preserve_order` feature is enabled transitively
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
