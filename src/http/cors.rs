//! CORS context detection and response headers.
//!
//! The relay marks every origin request with `X-Is-Cors`; both the origin
//! handler and the origin-response hook derive the same [`CorsContext`] from
//! it and attach the allow headers if and only if the flag is set.

use axum::http::{header, HeaderMap, HeaderValue};

use crate::http::headers::X_IS_CORS;

/// Methods advertised to cross-origin callers.
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";

/// Request headers advertised to cross-origin callers.
pub const ALLOWED_HEADERS: &str = "Content-Type";

/// Cross-origin-ness of a request plus its declared origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsContext {
    pub is_cors: bool,
    pub origin: Option<HeaderValue>,
}

impl CorsContext {
    /// Derive the context from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let is_cors = headers
            .get(X_IS_CORS)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            is_cors,
            origin: headers.get(header::ORIGIN).cloned(),
        }
    }

    /// Add the CORS allow headers when the request is cross-origin.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if !self.is_cors {
            return;
        }
        if self.origin.is_none() {
            tracing::warn!("No origin on cross-origin request, CORS headers carry an empty origin");
        }

        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            self.origin
                .clone()
                .unwrap_or_else(|| HeaderValue::from_static("")),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
    }
}

/// True when any `Access-Control-Allow-*` response header is present.
#[cfg(test)]
pub(crate) fn has_cors_headers(headers: &HeaderMap) -> bool {
    headers
        .keys()
        .any(|name| name.as_str().starts_with("access-control-allow-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.insert(name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_flag_is_case_insensitive() {
        assert!(CorsContext::from_headers(&headers(&[("x-is-cors", "TRUE")])).is_cors);
        assert!(CorsContext::from_headers(&headers(&[("x-is-cors", "True")])).is_cors);
        assert!(!CorsContext::from_headers(&headers(&[("x-is-cors", "false")])).is_cors);
        assert!(!CorsContext::from_headers(&headers(&[("x-is-cors", "yes")])).is_cors);
        assert!(!CorsContext::from_headers(&HeaderMap::new()).is_cors);
    }

    #[test]
    fn test_apply_echoes_origin() {
        let ctx = CorsContext::from_headers(&headers(&[
            ("x-is-cors", "true"),
            ("origin", "https://app.example.com"),
        ]));
        let mut out = HeaderMap::new();
        ctx.apply(&mut out);

        assert_eq!(out["access-control-allow-origin"], "https://app.example.com");
        assert_eq!(out["access-control-allow-credentials"], "true");
        assert_eq!(out["access-control-allow-methods"], "POST, OPTIONS");
        assert_eq!(out["access-control-allow-headers"], "Content-Type");
    }

    #[test]
    fn test_apply_without_origin_still_marks_cors() {
        let ctx = CorsContext {
            is_cors: true,
            origin: None,
        };
        let mut out = HeaderMap::new();
        ctx.apply(&mut out);
        assert_eq!(out["access-control-allow-origin"], "");
        assert!(has_cors_headers(&out));
    }

    #[test]
    fn test_same_origin_adds_nothing() {
        let ctx = CorsContext::from_headers(&headers(&[("origin", "https://app.example.com")]));
        let mut out = HeaderMap::new();
        ctx.apply(&mut out);
        assert!(out.is_empty());
        assert!(!has_cors_headers(&out));
    }
}
