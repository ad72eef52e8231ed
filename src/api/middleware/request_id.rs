//! Request correlation ids
//!
//! Every request, and so every unit of work, is tagged with an id. A
//! caller-supplied `x-request-id` is kept when it is short printable ASCII;
//! anything else is replaced with a fresh one. The id is echoed on the
//! response and attached to the request log and drain spans.

use std::fmt;

use axum::{
    extract::Request,
    http::{Extensions, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a caller-supplied id, or `None` if it is unusable in logs
    pub fn from_header(value: &HeaderValue) -> Option<Self> {
        let raw = value.to_str().ok()?.trim();
        let usable = !raw.is_empty()
            && raw.len() <= MAX_REQUEST_ID_LEN
            && raw.bytes().all(|b| b.is_ascii_graphic());
        usable.then(|| Self(raw.to_string()))
    }

    /// Id stored by [`request_id_middleware`], if it ran
    pub fn of(extensions: &Extensions) -> Option<&RequestId> {
        extensions.get::<RequestId>()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(RequestId::from_header)
        .unwrap_or_else(RequestId::generate);

    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_id_is_kept() {
        let id = RequestId::from_header(&HeaderValue::from_static(" req-42 ")).unwrap();
        assert_eq!(id.as_str(), "req-42");
        assert_eq!(id.to_string(), "req-42");
    }

    #[test]
    fn test_unusable_header_ids_are_rejected() {
        assert!(RequestId::from_header(&HeaderValue::from_static("")).is_none());
        assert!(RequestId::from_header(&HeaderValue::from_static("has space")).is_none());

        let long = "a".repeat(MAX_REQUEST_ID_LEN + 1);
        assert!(RequestId::from_header(&HeaderValue::from_str(&long).unwrap()).is_none());
    }

    #[test]
    fn test_generated_ids_differ() {
        let first = RequestId::generate();
        assert_ne!(first, RequestId::generate());
        assert!(Uuid::parse_str(first.as_str()).is_ok());
    }

    #[test]
    fn test_of_reads_extensions() {
        let mut extensions = Extensions::new();
        assert!(RequestId::of(&extensions).is_none());

        extensions.insert(RequestId("abc".to_string()));
        assert_eq!(RequestId::of(&extensions).map(RequestId::as_str), Some("abc"));
    }
}
