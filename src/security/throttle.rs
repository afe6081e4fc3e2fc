//! Usage-plan throttle: a token bucket per API key.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::config::schema::ThrottleConfig;
use crate::http::headers::X_API_KEY;
use crate::observability::metrics;
use crate::security::api_key::json_rejection;

/// Bucket key for callers that present no API key.
const ANONYMOUS: &str = "anonymous";

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared throttle state.
#[derive(Debug)]
pub struct UsagePlan {
    buckets: DashMap<String, TokenBucket>,
    enabled: bool,
    rate: f64,
    burst: f64,
}

impl UsagePlan {
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            enabled: config.enabled,
            rate: config.requests_per_second as f64,
            burst: config.burst_size as f64,
        }
    }

    /// Take a token for `key`. Always true when throttling is disabled.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst));
        bucket.try_acquire(self.burst, self.rate, now)
    }
}

/// Middleware function for the usage plan.
pub async fn throttle_middleware(
    State(plan): State<Arc<UsagePlan>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get(X_API_KEY)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(ANONYMOUS)
        .to_string();

    if plan.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!("Usage plan rate exceeded");
        metrics::record_throttled();
        json_rejection(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests")
    }
}
