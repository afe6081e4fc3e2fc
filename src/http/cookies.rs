//! Cookie header parsing and `Set-Cookie` rendering.

use std::collections::HashMap;
use std::fmt;

use axum::http::{header, HeaderMap};

/// Parse every `Cookie` header line into name/value pairs.
///
/// Pairs are `;`-separated and trimmed. Entries without `=` are skipped and
/// later duplicates win.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Look up a single cookie by name.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    parse_cookies(headers).remove(name)
}

/// Where a cookie is expected to travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieScope {
    /// Sent on cross-site requests: `SameSite=None; Secure`.
    CrossSite,
    /// First-party only: no `SameSite`/`Secure` attributes.
    FirstParty,
}

/// A `Set-Cookie` value with the attributes the relay uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub scope: CookieScope,
    pub max_age_secs: u64,
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; ", self.name, self.value)?;
        if self.scope == CookieScope::CrossSite {
            write!(f, "SameSite=None; Secure; ")?;
        }
        write!(f, "HttpOnly; Max-Age={}", self.max_age_secs)
    }
}
