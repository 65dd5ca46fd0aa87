//! Request identity and path normalization.
//!
//! # Responsibilities
//! - Attach a request ID as early as possible and echo it on the response
//! - Rewrite request paths per the routing options before route matching

use axum::extract::{Request, State};
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderValue, Uri};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::config::store::RoutingConfig;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Attach a v4 request ID unless the client supplied one, and echo it on
/// the response.
pub(crate) async fn assign_request_id(mut request: Request, next: Next) -> Response {
    if !request.headers().contains_key(X_REQUEST_ID) {
        if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            request.headers_mut().insert(X_REQUEST_ID, value);
        }
    }
    let id = request.headers().get(X_REQUEST_ID).cloned();

    let mut response = next.run(request).await;
    if let Some(id) = id {
        if !response.headers().contains_key(X_REQUEST_ID) {
            response.headers_mut().insert(X_REQUEST_ID, id);
        }
    }
    response
}

/// Rewrite the request path according to the routing options. Runs before
/// route matching.
pub(crate) async fn normalize_path(
    State(routing): State<RoutingConfig>,
    mut request: Request,
) -> Request {
    let path = request.uri().path();
    let mut normalized = path.to_string();

    if routing.treat_multiple_slashes_as_single_slash {
        while normalized.contains("//") {
            normalized = normalized.replace("//", "/");
        }
    }
    if routing.ignore_trailing_slashes {
        while normalized.len() > 1 && normalized.ends_with('/') {
            normalized.pop();
        }
    }

    if normalized != path {
        let path_and_query = match request.uri().query() {
            Some(query) => format!("{normalized}?{query}"),
            None => normalized,
        };
        let mut parts = request.uri().clone().into_parts();
        if let Ok(path_and_query) = path_and_query.parse::<PathAndQuery>() {
            parts.path_and_query = Some(path_and_query);
            if let Ok(uri) = Uri::from_parts(parts) {
                *request.uri_mut() = uri;
            }
        }
    }
    request
}
