//! camelCase ↔ snake_case key conversion.

use serde_json::{Map, Value};

use crate::convert::{ConvertError, Converter};

/// Renames object keys between a camelCase wire format and snake_case
/// objects, recursing through arrays and nested objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCase;

impl Converter for KeyCase {
    fn name(&self) -> &'static str {
        "key_case"
    }

    fn to_object(&self, payload: Value) -> Result<Value, ConvertError> {
        Ok(rename_keys(payload, &camel_to_snake))
    }

    fn to_payload(&self, object: Value) -> Result<Value, ConvertError> {
        Ok(rename_keys(object, &snake_to_camel))
    }
}

fn rename_keys(value: Value, rename: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (rename(&key), rename_keys(inner, rename)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| rename_keys(v, rename)).collect())
        }
        other => other,
    }
}

fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' && !out.is_empty() {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
