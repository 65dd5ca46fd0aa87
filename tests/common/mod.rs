//! Shared utilities for shell integration tests.

use std::time::Duration;

use axum::routing::get;
use axum::Router;

/// Routes used across the lifecycle and configuration tests: one endpoint
/// that answers immediately and one that stays in flight for a while.
#[allow(dead_code)]
pub fn demo_routes() -> Router {
    Router::new()
        .route("/immediate", get(|| async { "ok" }))
        .route(
            "/delayed",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                "done"
            }),
        )
}

#[allow(dead_code)]
pub fn url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{port}{path}")
}
