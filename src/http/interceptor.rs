//! Pre-routing request interceptors.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

/// Inspects requests before they reach the application router.
///
/// Interceptors run in registration order; returning a response ends the
/// request without touching the router.
pub trait Interceptor: Send + Sync {
    /// Name used in logs and ordering checks.
    fn name(&self) -> &str;

    /// Inspect, and possibly rewrite, the request. `Some(response)`
    /// short-circuits the chain.
    fn intercept(&self, request: &mut Request) -> Option<Response>;
}

/// Middleware running the interceptor chain ahead of the router.
pub(crate) async fn run_chain(
    State(chain): State<Arc<[Arc<dyn Interceptor>]>>,
    mut request: Request,
    next: Next,
) -> Response {
    for interceptor in chain.iter() {
        if let Some(response) = interceptor.intercept(&mut request) {
            debug!(interceptor = interceptor.name(), "request intercepted");
            return response;
        }
    }
    next.run(request).await
}

/// Redirects plaintext requests to `https`.
///
/// Installed at the head of the chain when `enforce_ssl` is set; must stay
/// ahead of every other interceptor. TLS itself terminates upstream, so the
/// scheme is taken from `x-forwarded-proto`.
pub struct SslRedirect;

impl SslRedirect {
    pub const NAME: &'static str = "ssl-redirect";
}

impl Interceptor for SslRedirect {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn intercept(&self, request: &mut Request) -> Option<Response> {
        let forwarded = request
            .headers()
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok());
        if forwarded == Some("https") {
            return None;
        }

        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())?;
        let host = host.split(':').next().unwrap_or(host);
        let target = format!(
            "https://{}{}",
            host,
            request
                .uri()
                .path_and_query()
                .map_or("/", |path_and_query| path_and_query.as_str())
        );

        Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header(header::LOCATION, target)
            .body(Body::empty())
            .ok()
    }
}
