//! Endpoint and reply contracts.

use axum::http::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::schema::validate::{RequestSchema, TypedSchema};

/// One `(path, method)` entry of an API schema.
///
/// `Api` is a marker type naming the schema the endpoint belongs to. Handler
/// registries and schema tables are parameterized by the same marker, so a
/// worker can only be registered for endpoints of its own API.
///
/// ```rust,ignore
/// struct ItemApi;
/// struct GetItem;
///
/// impl Endpoint for GetItem {
///     type Api = ItemApi;
///     const PATH: &'static str = "/item";
///     const METHOD: Method = Method::GET;
///     type Body = ItemQuery;
///     type Reply = Json<200, Item>;
/// }
/// ```
pub trait Endpoint: 'static {
    /// API marker this endpoint belongs to.
    type Api;

    /// Exact request path.
    const PATH: &'static str;

    /// HTTP method.
    const METHOD: Method;

    /// Validated request payload handed to the worker.
    type Body: DeserializeOwned + Send + Sync + 'static;

    /// Response map: status code → payload type.
    type Reply: Reply;

    /// Schema the raw payload must satisfy.
    ///
    /// Defaults to "deserializes as [`Endpoint::Body`]".
    fn request_schema() -> Arc<dyn RequestSchema> {
        Arc::new(TypedSchema::<Self::Body>::new())
    }
}

/// A response recorded by a worker.
///
/// Implementations are usually enums with one variant per status code, so the
/// payload type for each code is fixed by the type system.
pub trait Reply: Send + 'static {
    /// Status code this reply is sent with.
    fn status(&self) -> u16;

    /// Serialize the payload into its JSON form.
    fn to_payload(&self) -> serde_json::Result<Value>;
}

/// A reply with a single status code.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<const CODE: u16, T>(pub T);

impl<const CODE: u16, T> Reply for Json<CODE, T>
where
    T: Serialize + Send + 'static,
{
    fn status(&self) -> u16 {
        CODE
    }

    fn to_payload(&self) -> serde_json::Result<Value> {
        serde_json::to_value(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serializer;
    use serde_json::json;

    #[test]
    fn json_reply_uses_const_code() {
        let reply: Json<201, _> = Json(json!({"id": 1}));
        assert_eq!(reply.status(), 201);
        assert_eq!(reply.to_payload().unwrap(), json!({"id": 1}));
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cycle"))
        }
    }

    #[test]
    fn serialization_errors_surface() {
        let reply: Json<200, _> = Json(Unserializable);
        assert!(reply.to_payload().is_err());
    }
}
