//! Request schema collaborators.
//!
//! # Responsibilities
//! - Decide whether a raw JSON payload is acceptable for a route
//! - Return the (possibly normalized) payload on success
//!
//! # Design Decisions
//! - Success/failure only: validation detail is logged at debug level and
//!   never reaches the client
//! - JSON Schema documents are compiled once, at construction

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// Validation capability for one route's request payload.
pub trait RequestSchema: Send + Sync + 'static {
    /// Accept `payload`, returning the parsed value, or reject it with `None`.
    fn safe_parse(&self, payload: Value) -> Option<Value>;
}

/// Accepts any payload that deserializes as `T`.
pub struct TypedSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSchema")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> RequestSchema for TypedSchema<T>
where
    T: DeserializeOwned + 'static,
{
    fn safe_parse(&self, payload: Value) -> Option<Value> {
        match T::deserialize(&payload) {
            Ok(_) => Some(payload),
            Err(e) => {
                tracing::debug!(
                    schema = std::any::type_name::<T>(),
                    error = %e,
                    "Payload rejected"
                );
                None
            }
        }
    }
}

/// Accepts every payload unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyPayload;

impl RequestSchema for AnyPayload {
    fn safe_parse(&self, payload: Value) -> Option<Value> {
        Some(payload)
    }
}

/// Error compiling a JSON Schema document.
#[derive(Debug, thiserror::Error)]
#[error("invalid JSON schema: {0}")]
pub struct SchemaError(String);

/// Validates payloads against a JSON Schema document.
pub struct JsonSchema {
    validator: jsonschema::Validator,
}

impl JsonSchema {
    /// Compile a schema document.
    pub fn compile(schema: &Value) -> Result<Self, SchemaError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| SchemaError(e.to_string()))?;
        Ok(Self { validator })
    }
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema").finish_non_exhaustive()
    }
}

impl RequestSchema for JsonSchema {
    fn safe_parse(&self, payload: Value) -> Option<Value> {
        if self.validator.is_valid(&payload) {
            Some(payload)
        } else {
            tracing::debug!("Payload rejected by JSON schema");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct NewItem {
        name: String,
        count: u32,
    }

    #[test]
    fn typed_schema_accepts_matching_shape() {
        let schema = TypedSchema::<NewItem>::new();
        let payload = json!({"name": "pen", "count": 3});
        assert_eq!(schema.safe_parse(payload.clone()), Some(payload));
    }

    #[test]
    fn typed_schema_rejects_wrong_shape() {
        let schema = TypedSchema::<NewItem>::new();
        assert_eq!(schema.safe_parse(json!({"name": "pen"})), None);
        assert_eq!(schema.safe_parse(json!({"name": "pen", "count": -1})), None);
    }

    #[test]
    fn json_schema_gates_payloads() {
        let schema = JsonSchema::compile(&json!({
            "type": "object",
            "required": ["id"],
            "properties": { "id": { "type": "string", "pattern": "^[0-9]+$" } }
        }))
        .unwrap();

        assert!(schema.safe_parse(json!({"id": "17"})).is_some());
        assert!(schema.safe_parse(json!({"id": "x"})).is_none());
        assert!(schema.safe_parse(json!([])).is_none());
    }

    #[test]
    fn invalid_schema_document_is_an_error() {
        assert!(JsonSchema::compile(&json!({"type": 12})).is_err());
    }

    #[test]
    fn any_payload_passes_through() {
        assert_eq!(AnyPayload.safe_parse(json!(null)), Some(json!(null)));
    }
}
