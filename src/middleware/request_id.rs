use std::convert::Infallible;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// HTTP header carrying the request ID in both directions
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request correlation ID
///
/// Handlers take it as an extractor to tag their log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    fn from_header(value: &HeaderValue) -> Option<Self> {
        value.to_str().ok().and_then(|s| Uuid::parse_str(s).ok()).map(RequestId)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestId>()
            .copied()
            .unwrap_or_else(|| RequestId(Uuid::new_v4())))
    }
}

/// Reuses a valid incoming `x-request-id` or assigns a fresh v4 UUID, then echoes
/// it on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(RequestId::from_header)
        .unwrap_or_else(|| RequestId(Uuid::new_v4()));

    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Span for `TraceLayer`, tagged with the request ID set by the middleware
pub fn make_span_with_request_id(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_header_is_reused() {
        let id = Uuid::new_v4();
        let value = HeaderValue::from_str(&id.to_string()).unwrap();
        assert_eq!(RequestId::from_header(&value), Some(RequestId(id)));
    }

    #[test]
    fn test_invalid_header_is_ignored() {
        let value = HeaderValue::from_static("not-a-uuid");
        assert_eq!(RequestId::from_header(&value), None);
    }

    #[tokio::test]
    async fn test_extractor_reads_extension() {
        let id = RequestId(Uuid::new_v4());
        let mut request = axum::http::Request::builder().body(Body::empty()).unwrap();
        request.extensions_mut().insert(id);
        let (mut parts, _) = request.into_parts();

        let extracted = tokio_test::assert_ok!(RequestId::from_request_parts(&mut parts, &()).await);
        assert_eq!(extracted, id);
    }
}
