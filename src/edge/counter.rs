//! The client-held redirect counter.

use axum::http::{HeaderMap, HeaderValue};

use crate::http::cookies::{cookie_value, CookieScope, SetCookie};
use crate::http::headers::REDIRECT_COUNT_COOKIE;

/// Number of protocol redirects the client has already followed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RedirectCount(pub u32);

impl RedirectCount {
    /// Read the counter from the request cookies. Missing or malformed is zero.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        cookie_value(headers, REDIRECT_COUNT_COOKIE)
            .and_then(|v| v.parse::<u32>().ok())
            .map(Self)
            .unwrap_or_default()
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// `Set-Cookie` value carrying this count.
    pub fn set_cookie(self, scope: CookieScope, max_age_secs: u64) -> HeaderValue {
        let cookie = SetCookie {
            name: REDIRECT_COUNT_COOKIE.to_string(),
            value: self.0.to_string(),
            scope,
            max_age_secs,
        };
        // Name, digits and fixed attributes only: always a valid header value.
        HeaderValue::from_str(&cookie.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("RedirectCount=0"))
    }
}
