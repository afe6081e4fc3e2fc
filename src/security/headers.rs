//! Header sanitizing at the relay boundary.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Drop relay-internal headers a viewer tries to inject
//!
//! # Design Decisions
//! - Never trust `x-viewer-host`, `x-is-cors` or `x-api-key` from viewers;
//!   the relay sets them itself

use axum::http::{header, HeaderMap, HeaderName};

use crate::http::headers::{X_API_KEY, X_IS_CORS, X_VIEWER_HOST};

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

/// Remove connection-scoped headers that must not be forwarded.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in [
        header::CONNECTION,
        KEEP_ALIVE,
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ] {
        headers.remove(name);
    }
}

/// Remove headers only the relay may set.
pub fn strip_relay_internal(headers: &mut HeaderMap) {
    headers.remove(X_VIEWER_HOST);
    headers.remove(X_IS_CORS);
    headers.remove(X_API_KEY);
}
