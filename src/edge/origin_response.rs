//! Origin-response hook: the retry/redirect state machine.
//!
//! # State Machine
//! ```text
//! count >= ceiling             → original response (give up)
//! status != transient          → original response
//! cross-origin, no annotation  → original response
//! cross-origin OPTIONS         → 200 + CORS headers, answered at the edge
//! cross-origin POST            → 307 https://<viewer-host><path>, SameSite=None; Secure
//! same-origin POST             → 307 <path>, first-party cookie
//! anything else                → original response
//! ```
//!
//! The counter lives only in the client's `RedirectCount` cookie; the hook
//! keeps no state between invocations.

use axum::body::Bytes;
use axum::http::{header, HeaderValue, Method, Request, Response, StatusCode};

use crate::config::RedirectConfig;
use crate::edge::counter::RedirectCount;
use crate::http::cookies::CookieScope;
use crate::http::cors::CorsContext;
use crate::http::headers::X_VIEWER_HOST;
use crate::observability::metrics;

/// Parameters of the redirect protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectPolicy {
    /// Retry ceiling.
    pub max_redirects: u32,
    /// `Max-Age` of the counter cookie.
    pub cookie_max_age_secs: u64,
    /// The only origin status that triggers a redirect.
    pub transient_status: StatusCode,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            max_redirects: 3,
            cookie_max_age_secs: 60,
            transient_status: StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<&RedirectConfig> for RedirectPolicy {
    fn from(config: &RedirectConfig) -> Self {
        Self {
            max_redirects: config.max_redirects,
            cookie_max_age_secs: config.cookie_max_age_secs,
            transient_status: StatusCode::from_u16(config.transient_status)
                .unwrap_or(StatusCode::BAD_GATEWAY),
        }
    }
}

/// Decide what the client receives for an origin response.
///
/// `request` is the request as the origin saw it: viewer path, relay-attached
/// `x-is-cors`, the viewer's cookies and the `x-viewer-host` annotation.
pub fn origin_response<B>(
    request: &Request<B>,
    response: Response<Bytes>,
    policy: &RedirectPolicy,
) -> Response<Bytes> {
    let headers = request.headers();
    let cors = CorsContext::from_headers(headers);
    let current = RedirectCount::from_headers(headers);
    let next = current.next();

    if current.get() >= policy.max_redirects {
        if response.status() == policy.transient_status {
            tracing::info!(
                count = current.get(),
                status = %response.status(),
                "Redirect limit reached, returning original response"
            );
            metrics::record_retry_exhausted();
        }
        return response;
    }

    if response.status() != policy.transient_status {
        return response;
    }

    tracing::warn!(
        count = current.get(),
        method = %request.method(),
        path = %request.uri().path(),
        is_cors = cors.is_cors,
        "Transient origin failure detected"
    );

    let method = request.method();
    if cors.is_cors {
        let Some(host) = headers.get(X_VIEWER_HOST) else {
            tracing::error!("Missing x-viewer-host header for cross-origin request");
            return response;
        };

        if method == Method::OPTIONS {
            tracing::info!("Answering cross-origin preflight at the edge");
            return preflight_response(&cors);
        }

        if method == Method::POST {
            let Ok(host) = host.to_str() else {
                tracing::error!("x-viewer-host is not valid ASCII, not redirecting");
                return response;
            };
            let location = format!("https://{}{}", host, request.uri().path());
            tracing::info!(location = %location, count = next.get(), "Redirecting cross-origin POST");
            return redirect(&location, next, CookieScope::CrossSite, &cors, policy)
                .inspect(|_| metrics::record_redirect("cross_origin"))
                .unwrap_or(response);
        }
    } else if method == Method::POST {
        let location = request.uri().path();
        tracing::info!(location = %location, count = next.get(), "Redirecting same-origin POST");
        return redirect(location, next, CookieScope::FirstParty, &cors, policy)
            .inspect(|_| metrics::record_redirect("same_origin"))
            .unwrap_or(response);
    }

    tracing::debug!(method = %method, "Returning original response");
    response
}

/// `200` carrying only the CORS headers.
fn preflight_response(cors: &CorsContext) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    cors.apply(response.headers_mut());
    response
}

/// `307 Temporary Redirect` bumping the counter cookie.
///
/// Fails only if `location` cannot be carried in a header.
fn redirect(
    location: &str,
    count: RedirectCount,
    scope: CookieScope,
    cors: &CorsContext,
    policy: &RedirectPolicy,
) -> Option<Response<Bytes>> {
    let location = match HeaderValue::from_str(location) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Redirect target is not a valid header value");
            return None;
        }
    };

    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::TEMPORARY_REDIRECT;

    let headers = response.headers_mut();
    headers.insert(header::LOCATION, location);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(
        header::SET_COOKIE,
        count.set_cookie(scope, policy.cookie_max_age_secs),
    );
    if scope == CookieScope::CrossSite {
        cors.apply(headers);
    }

    Some(response)
}
