//! Request target and payload extraction.
//!
//! # Responsibilities
//! - Split the request target into the endpoint path and a query payload
//! - Decide whether a request carries a JSON body
//! - Buffer and decode that body
//!
//! # Design Decisions
//! - The endpoint is the raw path, not percent-decoded or normalized
//! - Query payloads mirror form decoding: a key seen once maps to a string,
//!   a repeated key maps to an array of strings
//! - Bodies are buffered whole, bounded by size and optionally by time;
//!   any read failure is the client's problem (400)

use axum::{
    body::Body,
    http::{header, HeaderMap, Uri},
};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::time::Duration;
use url::Url;

use crate::error::DispatchError;

/// Parsed request target.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Target {
    pub path: String,
    pub query: Value,
}

impl Target {
    pub(crate) fn parse(uri: &Uri) -> Result<Self, DispatchError> {
        let url = Url::parse("http://localhost/")
            .and_then(|base| base.join(&uri.to_string()))
            .map_err(|e| DispatchError::internal(format!("unparseable request target: {e}")))?;

        Ok(Self {
            path: uri.path().to_string(),
            query: query_to_value(url.query_pairs()),
        })
    }
}

fn query_to_value<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    Value::Object(map)
}

/// Whether the request declares a JSON body. Media-type parameters such as
/// `charset` are ignored.
pub(crate) fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Buffer the whole body and parse it as JSON.
pub(crate) async fn read_json(
    body: Body,
    max_bytes: usize,
    timeout: Option<Duration>,
) -> Result<Value, DispatchError> {
    let read = axum::body::to_bytes(body, max_bytes);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, read).await.map_err(|_| {
            tracing::warn!(timeout = ?limit, "Timed out reading request body");
            DispatchError::MalformedInput("body read timed out")
        })?,
        None => read.await,
    };
    let bytes = result.map_err(|e| {
        tracing::warn!(error = %e, "Failed to read request body");
        DispatchError::MalformedInput("unreadable body")
    })?;

    let text = String::from_utf8_lossy(&bytes);
    serde_json::from_str(&text).map_err(|_| DispatchError::MalformedInput("body is not JSON"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::HeaderValue;
    use rstest::rstest;
    use std::io;
    use serde_json::json;

    #[test]
    fn splits_path_and_query() {
        let uri: Uri = "/item?id=7&tag=a&tag=b&tag=c&q=hello%20world".parse().unwrap();
        let target = Target::parse(&uri).unwrap();
        assert_eq!(target.path, "/item");
        assert_eq!(
            target.query,
            json!({"id": "7", "tag": ["a", "b", "c"], "q": "hello world"})
        );
    }

    #[test]
    fn missing_query_is_empty_object() {
        let target = Target::parse(&"/item".parse().unwrap()).unwrap();
        assert_eq!(target.query, json!({}));
    }

    #[test]
    fn path_is_not_decoded() {
        let target = Target::parse(&"/a%20b".parse().unwrap()).unwrap();
        assert_eq!(target.path, "/a%20b");
    }

    #[rstest]
    #[case(Some("application/json"), true)]
    #[case(Some("application/json; charset=utf-8"), true)]
    #[case(Some("Application/JSON"), true)]
    #[case(Some("text/plain"), false)]
    #[case(Some("application/jsonp"), false)]
    #[case(None, false)]
    fn detects_json_content_type(#[case] content_type: Option<&'static str>, #[case] expected: bool) {
        let mut headers = HeaderMap::new();
        if let Some(value) = content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
        }
        assert_eq!(is_json(&headers), expected);
    }

    #[tokio::test]
    async fn reads_json_body() {
        let value = read_json(Body::from(r#"{"a":[1,2]}"#), 1024, None)
            .await
            .unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));
    }

    #[rstest]
    #[case("")]
    #[case("{not json")]
    #[case("{\"a\":1} trailing")]
    #[tokio::test]
    async fn rejects_non_json(#[case] body: &'static str) {
        let err = read_json(Body::from(body), 1024, None).await.unwrap_err();
        assert_eq!(err, DispatchError::MalformedInput("body is not JSON"));
    }

    #[tokio::test]
    async fn rejects_oversized_body() {
        let err = read_json(Body::from("[1,2,3,4,5,6,7,8]"), 4, None)
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::MalformedInput("unreadable body"));
    }

    #[tokio::test]
    async fn stalled_body_times_out() {
        let stalled = futures_util::stream::pending::<Result<Bytes, io::Error>>();
        let err = read_json(
            Body::from_stream(stalled),
            1024,
            Some(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
        assert_eq!(err, DispatchError::MalformedInput("body read timed out"));
    }

    #[tokio::test]
    async fn transport_error_is_unreadable() {
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"name\":")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        ];
        let err = read_json(
            Body::from_stream(futures_util::stream::iter(chunks)),
            1024,
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();
        assert_eq!(err, DispatchError::MalformedInput("unreadable body"));
    }
}
