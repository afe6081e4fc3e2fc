//! The greeting handler behind the relay.
//!
//! # Evaluation Order
//! ```text
//! failure draw fires           → 502 {"message": "Bad Gateway: Random failure."}
//! OPTIONS + cross-origin       → 200 preflight, CORS headers only
//! not POST                     → 405 {"error": "Method Not Allowed"}
//! body lacks a non-blank name  → 400 {"error": "Invalid request body"}
//! otherwise                    → 200 {"message": "Hi <name>!"}
//! any other fault              → 500 {"message": "Internal Server Error."}
//! ```
//!
//! The draw happens before the preflight check, so a preflight can itself
//! come back as an injected 502; the origin-response hook then answers it at
//! the edge. Probably a latent defect; the observable behavior is preserved.

use axum::body::Bytes;
use axum::http::{header, HeaderValue, Method, Request, Response, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::http::body::{ErrorBody, MessageBody};
use crate::http::cors::CorsContext;
use crate::observability::metrics;
use crate::origin::failure::FailureSource;

/// Body of the catch-all 500, kept static so it cannot fail to build.
pub const INTERNAL_ERROR_BODY: &[u8] = br#"{"message":"Internal Server Error."}"#;

/// Faults that escape the normal response paths.
#[derive(Debug, Error)]
pub enum OriginError {
    #[error("failed to encode response body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why a POST body was rejected.
#[derive(Debug, Error)]
enum BodyError {
    #[error("request body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid name provided")]
    InvalidName,
}

/// Produce the origin response for a request. Never fails.
pub fn handle<B: AsRef<[u8]>>(request: &Request<B>, failures: &dyn FailureSource) -> Response<Bytes> {
    let cors = CorsContext::from_headers(request.headers());

    let response = match respond(request, &cors, failures) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Unexpected error");
            internal_error(&cors)
        }
    };

    metrics::record_origin_response(response.status());
    response
}

fn respond<B: AsRef<[u8]>>(
    request: &Request<B>,
    cors: &CorsContext,
    failures: &dyn FailureSource,
) -> Result<Response<Bytes>, OriginError> {
    if failures.should_fail() {
        tracing::warn!(method = %request.method(), "Random 502 error triggered");
        metrics::record_injected_failure();
        let body = MessageBody::new("Bad Gateway: Random failure.").to_bytes()?;
        return Ok(json_response(StatusCode::BAD_GATEWAY, body, cors));
    }

    if request.method() == Method::OPTIONS && cors.is_cors {
        let mut response = Response::new(MessageBody::new("Preflight response").to_bytes()?);
        cors.apply(response.headers_mut());
        return Ok(response);
    }

    if request.method() != Method::POST {
        let body = ErrorBody::new("Method Not Allowed").to_bytes()?;
        return Ok(json_response(StatusCode::METHOD_NOT_ALLOWED, body, cors));
    }

    let name = match parse_name(request.body().as_ref()) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid request body");
            let body = ErrorBody::new("Invalid request body").to_bytes()?;
            return Ok(json_response(StatusCode::BAD_REQUEST, body, cors));
        }
    };

    let body = MessageBody::new(format!("Hi {name}!")).to_bytes()?;
    Ok(json_response(StatusCode::OK, body, cors))
}

/// Extract the trimmed, non-empty `name` from a JSON object body.
///
/// An empty body is read as `{}`.
fn parse_name(body: &[u8]) -> Result<String, BodyError> {
    let body = if body.is_empty() { b"{}".as_slice() } else { body };
    let value: Value = serde_json::from_slice(body)?;

    let name = value
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .ok_or(BodyError::InvalidName)?;

    if name.is_empty() {
        return Err(BodyError::InvalidName);
    }
    Ok(name.to_string())
}

fn json_response(status: StatusCode, body: Bytes, cors: &CorsContext) -> Response<Bytes> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    cors.apply(response.headers_mut());
    response
}

/// The catch-all 500, also used for panics caught in the origin service.
pub fn internal_error(cors: &CorsContext) -> Response<Bytes> {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        Bytes::from_static(INTERNAL_ERROR_BODY),
        cors,
    )
}
