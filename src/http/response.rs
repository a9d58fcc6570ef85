//! Response packaging.
//!
//! # Responsibilities
//! - Turn a worker's reply into the wire response
//! - Answer CORS preflights
//!
//! # Design Decisions
//! - The reply payload becomes JSON text here, never inside the facade
//! - One `Set-Cookie` header line per cookie
//! - Anything that cannot be put on the wire (bad status, bad header
//!   bytes, unserializable payload) is our failure (500)

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};

use crate::convert::ConverterChain;
use crate::error::DispatchError;
use crate::handler::Invocation;

/// Build the success response for a finished worker.
pub(crate) fn package(
    invocation: Invocation,
    converters: &ConverterChain,
) -> Result<Response, DispatchError> {
    let status = StatusCode::from_u16(invocation.status).map_err(|_| {
        DispatchError::internal(format!("invalid reply status {}", invocation.status))
    })?;

    let payload = converters
        .to_payload(invocation.payload)
        .map_err(|e| DispatchError::internal(format!("reply conversion failed: {e}")))?;
    let content = serde_json::to_string(&payload)
        .map_err(|e| DispatchError::internal(format!("reply not serializable: {e}")))?;

    let cache_control = HeaderValue::from_str(&invocation.cache_control)
        .map_err(|_| DispatchError::internal("invalid cache-control value"))?;

    let mut response = Response::new(Body::from(content));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::CACHE_CONTROL, cache_control);
    for cookie in invocation.cookies.into_iter().flatten() {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|_| DispatchError::internal("invalid set-cookie value"))?;
        headers.append(header::SET_COOKIE, value);
    }

    Ok(response)
}

/// Bare 204 answer to an `OPTIONS` request.
pub(crate) fn preflight() -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::KeyCase;
    use serde_json::{json, Value};

    fn invocation(status: u16, payload: Value, cookies: Option<Vec<String>>) -> Invocation {
        Invocation {
            status,
            payload,
            cookies,
            cache_control: "no-store".into(),
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn packages_json_reply() {
        let response = package(
            invocation(
                201,
                json!({"id": 1}),
                Some(vec!["a=1".into(), "b=2; HttpOnly".into()]),
            ),
            &ConverterChain::new(),
        )
        .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        let cookies: Vec<_> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies, vec!["a=1", "b=2; HttpOnly"]);
        assert_eq!(body_text(response).await, r#"{"id":1}"#);
    }

    #[tokio::test]
    async fn applies_reverse_converters() {
        let response = package(
            invocation(200, json!({"created_at": 5}), None),
            &ConverterChain::new().with(KeyCase),
        )
        .unwrap();
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(body_text(response).await, r#"{"createdAt":5}"#);
    }

    #[test]
    fn rejects_unsendable_replies() {
        let chain = ConverterChain::new();
        assert!(package(invocation(42, json!(null), None), &chain).is_err());
        assert!(package(
            invocation(200, json!(null), Some(vec!["bad\ncookie".into()])),
            &chain
        )
        .is_err());
    }

    #[test]
    fn preflight_is_empty_204() {
        let response = preflight();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().is_empty());
    }
}
