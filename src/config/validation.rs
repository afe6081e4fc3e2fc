//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (probability in [0, 1], timeouts > 0, addresses parse)
//! - Detect duplicate relay distributions
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::StatusCode;
use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: String, value: String },

    #[error("origin.failure_probability must be within [0, 1], got {0}")]
    FailureProbability(f64),

    #[error("origin.route must start with '/', got {0:?}")]
    Route(String),

    #[error("origin.throttle: rate and burst must be greater than zero")]
    Throttle,

    #[error("relay distribution name must not be empty")]
    EmptyRelayName,

    #[error("duplicate relay distribution {0:?}")]
    DuplicateRelay(String),

    #[error("relay {name:?}: origin_url {url:?} is not an http URL")]
    OriginUrl { name: String, url: String },

    #[error("relay {0:?}: tls cert_path and key_path must be set")]
    Tls(String),

    #[error("redirect.transient_status must be a 5xx server error status, got {0}")]
    TransientStatus(u16),

    #[error("redirect.cookie_max_age_secs must be greater than zero")]
    CookieMaxAge,

    #[error("timeouts.{0} must be greater than zero")]
    Timeout(&'static str),

    #[error("security.max_body_size must be greater than zero")]
    BodyLimit,
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let origin = &config.origin;
    if origin.enabled {
        check_address(&mut errors, "origin.bind_address", &origin.bind_address);
    }
    if !is_probability(origin.failure_probability) {
        errors.push(ValidationError::FailureProbability(origin.failure_probability));
    }
    if !origin.route.starts_with('/') {
        errors.push(ValidationError::Route(origin.route.clone()));
    }
    if origin.throttle.enabled
        && (origin.throttle.requests_per_second == 0 || origin.throttle.burst_size == 0)
    {
        errors.push(ValidationError::Throttle);
    }

    let mut names = HashSet::new();
    for relay in &config.relays {
        if relay.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRelayName);
        } else if !names.insert(relay.name.as_str()) {
            errors.push(ValidationError::DuplicateRelay(relay.name.clone()));
        }

        check_address(
            &mut errors,
            &format!("relays.{}.bind_address", relay.name),
            &relay.bind_address,
        );

        let origin_ok = Url::parse(&relay.origin_url)
            .map(|url| url.scheme() == "http" && url.host().is_some())
            .unwrap_or(false);
        if !origin_ok {
            errors.push(ValidationError::OriginUrl {
                name: relay.name.clone(),
                url: relay.origin_url.clone(),
            });
        }

        if let Some(tls) = &relay.tls {
            if tls.cert_path.is_empty() || tls.key_path.is_empty() {
                errors.push(ValidationError::Tls(relay.name.clone()));
            }
        }
    }

    let status = config.redirect.transient_status;
    let server_error = StatusCode::from_u16(status)
        .map(|s| s.is_server_error())
        .unwrap_or(false);
    if !server_error {
        errors.push(ValidationError::TransientStatus(status));
    }
    if config.redirect.cookie_max_age_secs == 0 {
        errors.push(ValidationError::CookieMaxAge);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Timeout("request_secs"));
    }
    if config.timeouts.origin_secs == 0 {
        errors.push(ValidationError::Timeout("origin_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::BodyLimit);
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a failure probability given on the command line.
pub fn parse_probability(value: &str) -> Result<f64, String> {
    let probability: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("{value:?} is not a number"))?;
    if is_probability(probability) {
        Ok(probability)
    } else {
        Err(format!("{probability} is not within [0, 1]"))
    }
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}
