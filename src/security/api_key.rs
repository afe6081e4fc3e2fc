//! Shared-key gate in front of the origin handler.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::body::MessageBody;
use crate::http::headers::X_API_KEY;

/// State required for the key check.
#[derive(Clone, Debug, Default)]
pub struct ApiKeyState {
    /// Expected key. `None` disables the check.
    pub expected: Option<Arc<str>>,
}

impl ApiKeyState {
    pub fn new(expected: Option<&str>) -> Self {
        Self {
            expected: expected.map(Arc::from),
        }
    }

    fn accepts(&self, presented: Option<&str>) -> bool {
        match &self.expected {
            None => true,
            Some(expected) => presented == Some(expected.as_ref()),
        }
    }
}

pub async fn api_key_middleware(
    State(state): State<ApiKeyState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(X_API_KEY)
        .and_then(|v| v.to_str().ok());

    if state.accepts(presented) {
        return next.run(request).await;
    }

    tracing::warn!(
        path = %request.uri().path(),
        key_present = presented.is_some(),
        "Rejected request without a valid API key"
    );
    json_rejection(StatusCode::FORBIDDEN, "Forbidden")
}

/// Gateway-style JSON rejection (`{"message": ...}`).
pub(crate) fn json_rejection(status: StatusCode, message: &str) -> Response {
    match MessageBody::new(message).to_bytes() {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response(),
        Err(_) => status.into_response(),
    }
}
