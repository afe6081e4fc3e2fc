//! Viewer-request hook.
//!
//! Runs on every inbound request before the relay rewrites `Host` for the
//! origin, so the origin-response hook can still rebuild a URL the viewer
//! can reach.

use axum::http::{header, Request};

use crate::http::headers::X_VIEWER_HOST;

/// Copy the viewer `Host` verbatim into `x-viewer-host`.
///
/// Requests without a `Host` pass through unchanged. Idempotent.
pub fn viewer_request<B>(mut request: Request<B>) -> Request<B> {
    if let Some(host) = request.headers().get(header::HOST).cloned() {
        request.headers_mut().insert(X_VIEWER_HOST, host);
    }
    request
}
