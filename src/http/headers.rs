//! Header names shared by the relay, the hooks and the origin.

use axum::http::HeaderName;

/// Viewer `Host` captured at the edge before the relay rewrites it.
pub const X_VIEWER_HOST: HeaderName = HeaderName::from_static("x-viewer-host");

/// Relay-attached flag telling the origin whether the caller is cross-origin.
pub const X_IS_CORS: HeaderName = HeaderName::from_static("x-is-cors");

/// Relay-attached shared key checked in front of the origin handler.
pub const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// Request correlation id, set at every hop if missing.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Cookie carrying the redirect counter.
pub const REDIRECT_COUNT_COOKIE: &str = "RedirectCount";
