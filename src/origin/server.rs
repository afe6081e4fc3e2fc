//! Origin HTTP service.
//!
//! # Responsibilities
//! - Mount the greeting handler on the configured route (any method)
//! - Gate it behind the shared API key and the usage-plan throttle
//! - Map panics to the JSON 500 the handler itself uses
//! - Request ids, tracing, timeout and body limit

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response as HttpResponse, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::body::ErrorBody;
use crate::http::cors::CorsContext;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::origin::failure::FailureSource;
use crate::origin::handler::{self, INTERNAL_ERROR_BODY};
use crate::security::api_key::{api_key_middleware, ApiKeyState};
use crate::security::throttle::{throttle_middleware, UsagePlan};

/// Application state injected into the handler.
#[derive(Clone)]
pub struct OriginState {
    pub failures: Arc<dyn FailureSource>,
    pub max_body_size: usize,
}

/// HTTP server for the origin.
pub struct OriginServer {
    router: Router,
}

impl OriginServer {
    /// Create a new origin server with the given configuration.
    pub fn new(config: &AppConfig, failures: Arc<dyn FailureSource>) -> Self {
        let state = OriginState {
            failures,
            max_body_size: config.security.max_body_size,
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: OriginState) -> Router {
        let api_keys = ApiKeyState::new(config.origin.api_key.as_deref());
        let plan = Arc::new(UsagePlan::new(&config.origin.throttle));

        Router::new()
            .route(&config.origin.route, any(origin_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(plan, throttle_middleware))
            .layer(middleware::from_fn_with_state(api_keys, api_key_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(CatchPanicLayer::custom(panic_response))
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// The router, for serving on a custom listener.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Origin server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Origin server stopped");
        Ok(())
    }
}

/// Buffer the body and hand the request to the greeting handler.
async fn origin_handler(State(state): State<OriginState>, request: Request<Body>) -> Response {
    let request_id = request_id(&request);
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            let cors = CorsContext::from_headers(&parts.headers);
            let mut response = (
                StatusCode::BAD_REQUEST,
                axum::Json(ErrorBody::new("Invalid request body")),
            )
                .into_response();
            cors.apply(response.headers_mut());
            return response;
        }
    };

    let request = Request::from_parts(parts, bytes);
    let response = handler::handle(&request, state.failures.as_ref());

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        status = %response.status(),
        "Origin response"
    );
    response.map(Body::from).into_response()
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> HttpResponse<String> {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Origin handler panicked");

    let mut response = HttpResponse::new(String::from_utf8_lossy(INTERNAL_ERROR_BODY).into_owned());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("application/json"),
    );
    response
}
