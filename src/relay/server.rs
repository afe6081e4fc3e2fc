//! Relay HTTP service: one per distribution.
//!
//! # Responsibilities
//! - Accept viewer requests on plain TCP or TLS
//! - Run the viewer-request hook when the distribution attaches it
//! - Forward to the origin with the distribution's headers
//! - Run the origin-response hook on whatever came back
//!
//! # Request Path
//! ```text
//! viewer → strip spoofed/hop-by-hop headers → [viewer_request]
//!        → drop Host, add X-API-Key + X-Is-Cors → origin
//!        → origin_response(forwarded request, origin response) → viewer
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, Request, Response as HttpResponse, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use url::Url;

use crate::config::{AppConfig, DistributionConfig};
use crate::edge::{origin_response, viewer_request, RedirectPolicy};
use crate::http::body::MessageBody;
use crate::http::cors::CorsContext;
use crate::http::headers::{X_API_KEY, X_IS_CORS};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::observability::metrics;
use crate::security::headers::{strip_hop_by_hop, strip_relay_internal};

/// How long an in-flight TLS connection may drain after shutdown.
const TLS_DRAIN: Duration = Duration::from_secs(10);

/// Relay setup and forwarding errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid origin url: {0}")]
    OriginUrl(#[from] url::ParseError),

    #[error("origin url must use http, got {0}")]
    UnsupportedScheme(String),

    #[error("api key is not a valid header value")]
    ApiKey(#[from] axum::http::header::InvalidHeaderValue),

    #[error("invalid origin uri: {0}")]
    InvalidUri(#[from] axum::http::uri::InvalidUri),

    #[error("failed to build origin request: {0}")]
    Build(#[from] axum::http::Error),

    #[error("origin request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read origin body: {0}")]
    Body(#[from] axum::Error),

    #[error("origin did not answer within {0:?}")]
    Timeout(Duration),
}

/// Application state injected into the relay handler.
#[derive(Clone)]
pub struct RelayState {
    pub distribution: Arc<DistributionConfig>,
    origin: Url,
    api_key: Option<HeaderValue>,
    client: Client<HttpConnector, Body>,
    policy: Arc<ArcSwap<RedirectPolicy>>,
    max_body_size: usize,
    origin_timeout: Duration,
}

/// HTTP server for one distribution.
pub struct RelayServer {
    name: String,
    router: Router,
}

impl RelayServer {
    /// Create a relay for `distribution`, sharing the hot-swappable `policy`.
    pub fn new(
        distribution: &DistributionConfig,
        config: &AppConfig,
        policy: Arc<ArcSwap<RedirectPolicy>>,
    ) -> Result<Self, RelayError> {
        let origin = Url::parse(&distribution.origin_url)?;
        if origin.scheme() != "http" {
            return Err(RelayError::UnsupportedScheme(origin.scheme().to_string()));
        }
        let api_key = distribution
            .api_key
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = RelayState {
            distribution: Arc::new(distribution.clone()),
            origin,
            api_key,
            client,
            policy,
            max_body_size: config.security.max_body_size,
            origin_timeout: Duration::from_secs(config.timeouts.origin_secs),
        };

        Ok(Self {
            name: distribution.name.clone(),
            router: Self::build_router(config, state),
        })
    }

    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: RelayState) -> Router {
        Router::new()
            .route("/", any(relay_handler))
            .route("/{*path}", any(relay_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Serve plain HTTP until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(distribution = %self.name, address = %addr, "Relay starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(distribution = %self.name, "Relay stopped");
        Ok(())
    }

    /// Serve HTTPS until the shutdown signal fires.
    pub async fn run_tls(
        self,
        listener: std::net::TcpListener,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(distribution = %self.name, address = %addr, "Relay starting with TLS");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            drain.graceful_shutdown(Some(TLS_DRAIN));
        });

        axum_server::from_tcp_rustls(listener, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!(distribution = %self.name, "Relay stopped");
        Ok(())
    }
}

/// Relay one viewer request through the origin and both hooks.
async fn relay_handler(State(state): State<RelayState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    // In-flight requests keep the policy they started with.
    let policy = **state.policy.load();
    let distribution = state.distribution.name.as_str();

    let (mut parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read viewer body");
            let cors = CorsContext {
                is_cors: state.distribution.is_cors,
                origin: parts.headers.get(header::ORIGIN).cloned(),
            };
            let mut response = (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(MessageBody::new("Request body too large")),
            )
                .into_response();
            cors.apply(response.headers_mut());
            metrics::record_relay_request(distribution, response.status().as_u16(), start);
            return response;
        }
    };

    strip_relay_internal(&mut parts.headers);
    strip_hop_by_hop(&mut parts.headers);
    // HTTP/2 viewers carry the host in `:authority` only.
    if !parts.headers.contains_key(header::HOST) {
        if let Some(authority) = parts.uri.authority() {
            if let Ok(host) = HeaderValue::from_str(authority.as_str()) {
                parts.headers.insert(header::HOST, host);
            }
        }
    }

    let mut viewer = Request::from_parts(parts, ());
    if state.distribution.viewer_request_hook {
        viewer = viewer_request(viewer);
    }
    let forwarded = prepare_forward(viewer, &state);

    tracing::debug!(
        request_id = %request_id,
        distribution = %distribution,
        method = %forwarded.method(),
        path = %forwarded.uri().path(),
        "Forwarding to origin"
    );

    let cors = CorsContext::from_headers(forwarded.headers());
    let origin = match forward(&state, &forwarded, bytes).await {
        Ok(response) => response,
        Err(RelayError::Timeout(after)) => {
            tracing::error!(request_id = %request_id, timeout = ?after, "Origin timed out");
            metrics::record_upstream_error("timeout");
            synthesized(StatusCode::GATEWAY_TIMEOUT, "Gateway Timeout", &cors)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Origin unreachable");
            metrics::record_upstream_error("unreachable");
            synthesized(StatusCode::BAD_GATEWAY, "Bad Gateway", &cors)
        }
    };

    let response = origin_response(&forwarded, origin, &policy);
    metrics::record_relay_request(distribution, response.status().as_u16(), start);
    response.map(Body::from)
}

/// Swap viewer identity for the distribution's origin headers.
fn prepare_forward(mut request: Request<()>, state: &RelayState) -> Request<()> {
    let headers = request.headers_mut();
    headers.remove(header::HOST);
    if let Some(key) = &state.api_key {
        headers.insert(X_API_KEY, key.clone());
    }
    let is_cors = if state.distribution.is_cors { "true" } else { "false" };
    headers.insert(X_IS_CORS, HeaderValue::from_static(is_cors));
    request
}

/// `<origin base><viewer path+query>`
fn origin_uri(base: &Url, viewer: &Uri) -> Result<Uri, RelayError> {
    let path_and_query = viewer.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let uri = format!("{}{}", base.as_str().trim_end_matches('/'), path_and_query);
    Ok(uri.parse()?)
}

async fn forward(
    state: &RelayState,
    forwarded: &Request<()>,
    body: Bytes,
) -> Result<HttpResponse<Bytes>, RelayError> {
    let mut upstream = Request::builder()
        .method(forwarded.method().clone())
        .uri(origin_uri(&state.origin, forwarded.uri())?)
        .body(Body::from(body))?;
    *upstream.headers_mut() = forwarded.headers().clone();

    let response: HttpResponse<hyper::body::Incoming> = tokio::time::timeout(state.origin_timeout, state.client.request(upstream))
        .await
        .map_err(|_| RelayError::Timeout(state.origin_timeout))??;

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    let bytes = axum::body::to_bytes(Body::new(body), state.max_body_size).await?;
    Ok(HttpResponse::from_parts(parts, bytes))
}

/// The relay's own JSON reply, carrying CORS headers on cross-origin distributions.
fn synthesized(status: StatusCode, message: &str, cors: &CorsContext) -> HttpResponse<Bytes> {
    let body = MessageBody::new(message).to_bytes().unwrap_or_default();
    let mut response = HttpResponse::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    cors.apply(response.headers_mut());
    response
}
