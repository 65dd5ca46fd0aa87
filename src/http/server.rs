//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Mount the application router under the configured context path
//! - Wire up middleware: tracing, request IDs, request tracking,
//!   interceptors, default content type, compression, size and time limits
//! - Serve connections until the listener-close signal fires

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::snapshot::ConfigSnapshot;
use crate::config::store::CompressionStrategy;
use crate::http::interceptor::{run_chain, Interceptor};
use crate::http::request::{assign_request_id, normalize_path};
use crate::lifecycle::tracker::RequestTracker;
use crate::observability::metrics;

/// HTTP server for one shell instance.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(
        snapshot: Arc<ConfigSnapshot>,
        interceptors: Vec<Arc<dyn Interceptor>>,
        tracker: RequestTracker,
        app_routes: Router,
    ) -> Self {
        let router = Self::build_router(&snapshot, interceptors, tracker, app_routes);
        Self { router }
    }

    /// Build the middleware stack around the application router.
    fn build_router(
        snapshot: &ConfigSnapshot,
        interceptors: Vec<Arc<dyn Interceptor>>,
        tracker: RequestTracker,
        app_routes: Router,
    ) -> Router {
        let chain: Arc<[Arc<dyn Interceptor>]> = interceptors.into();
        let content_type = HeaderValue::from_str(&snapshot.default_content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("text/plain"));

        let mut router = if snapshot.context_path == "/" {
            app_routes
        } else {
            Router::new().nest(&snapshot.context_path, app_routes)
        };

        router = router.layer(RequestBodyLimitLayer::new(snapshot.max_request_size as usize));
        if let Some(timeout) = snapshot.async_request_timeout() {
            router = router.layer(TimeoutLayer::new(timeout));
        }
        router = router.layer(middleware::map_request_with_state(
            snapshot.routing.clone(),
            normalize_path,
        ));
        if snapshot.compression == CompressionStrategy::Gzip {
            router = router.layer(CompressionLayer::new());
        }
        router
            .layer(SetResponseHeaderLayer::if_not_present(
                header::CONTENT_TYPE,
                content_type,
            ))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn(assign_request_id))
                    .layer(middleware::from_fn_with_state(tracker, track_request))
                    .layer(middleware::from_fn_with_state(chain, run_chain)),
            )
    }

    /// Serve connections until the close signal fires, then finish in-flight
    /// connections and return.
    pub async fn run(
        self,
        listener: TcpListener,
        mut close: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::debug!(address = %addr, "http server accepting connections");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = close.recv().await;
            })
            .await?;

        tracing::debug!(address = %addr, "http server stopped");
        Ok(())
    }
}

/// Registers every request with the tracker for the span of its handling.
///
/// Requests arriving after the tracker closed are refused; the listener is
/// already closing at that point and keep-alive connections must not sneak
/// new work past the drain.
async fn track_request(
    State(tracker): State<RequestTracker>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let handle = match tracker.enter() {
        Ok(handle) => handle,
        Err(_) => {
            metrics::record_rejected();
            return (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down").into_response();
        }
    };
    metrics::set_active_requests(tracker.active_count());

    let started = Instant::now();
    let response = next.run(request).await;

    if let Err(error) = tracker.leave(&handle) {
        tracing::warn!(%error, "request release failed");
    }
    metrics::set_active_requests(tracker.active_count());
    metrics::record_request(&method, response.status(), started);

    response
}
