//! HTTP server setup and the request gate.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Admit or reject each request through the rate limiter
//! - Pick a backend and forward the request to it
//! - Serve until the shutdown signal fires

use axum::{
    Router,
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, Version},
    response::Response,
    routing::any,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::TimeoutConfig;
use crate::http::client::{UpstreamClient, upstream_client};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID, client_id, upstream_uri};
use crate::http::response::{error_response, finish_upstream};
use crate::load_balancer::BackendSelector;
use crate::observability::metrics;
use crate::security::Admission;
use crate::security::headers::prepare_forward_headers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub selector: Arc<dyn BackendSelector>,
    pub admission: Arc<dyn Admission>,
    pub client: UpstreamClient,
}

/// HTTP front end of the load balancer.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server that gates requests with `admission` and routes
    /// them to whatever `selector` picks.
    pub fn new(
        selector: Arc<dyn BackendSelector>,
        admission: Arc<dyn Admission>,
        timeouts: &TimeoutConfig,
    ) -> Self {
        let client = upstream_client();

        let state = AppState {
            selector,
            admission,
            client,
        };

        let router = Self::build_router(timeouts, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(timeouts: &TimeoutConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Checks the client's rate limit, selects a backend, and forwards.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let client = client_id(&peer);
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    // 1. Admission
    if !state.admission.allow(&client) {
        tracing::warn!(request_id = %request_id, client = %client, "Rate limit exceeded");
        metrics::record_rate_limited();
        metrics::record_request(&method, 429, "none", start_time);
        return error_response(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded");
    }

    // 2. Backend selection
    let Some(backend) = state.selector.next_url() else {
        tracing::warn!(request_id = %request_id, "No live backends");
        metrics::record_no_backend();
        metrics::record_request(&method, 503, "none", start_time);
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "no available backends");
    };

    // 3. Rewrite
    let (mut parts, body) = request.into_parts();
    parts.uri = match upstream_uri(&backend, &parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, backend = %backend, error = %e, "Failed to build upstream URI");
            metrics::record_request(&method, 503, backend.as_str(), start_time);
            return error_response(StatusCode::SERVICE_UNAVAILABLE, "backend unavailable");
        }
    };
    parts.version = Version::HTTP_11;
    prepare_forward_headers(&mut parts.headers, peer.ip());

    tracing::debug!(
        request_id = %request_id,
        backend = %backend,
        method = %method,
        path = %path,
        "Forwarding request"
    );

    // 4. Forward
    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&method, status.as_u16(), backend.as_str(), start_time);
            tracing::info!(
                request_id = %request_id,
                backend = %backend,
                status = %status,
                elapsed = ?start_time.elapsed(),
                "Request completed"
            );
            finish_upstream(response)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, backend = %backend, error = %e, "Backend error");
            metrics::record_request(&method, 503, backend.as_str(), start_time);
            error_response(StatusCode::SERVICE_UNAVAILABLE, "backend unavailable")
        }
    }
}
