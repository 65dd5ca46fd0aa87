//! Immutable configuration snapshot.

use std::time::Duration;

use serde::Serialize;

use crate::config::store::{CompressionStrategy, ConfigStore, RoutingConfig};

/// Point-in-time copy of the configuration values a running instance uses.
///
/// Built once when `start` is invoked and never mutated afterwards; later
/// changes to the originating [`ConfigStore`] are invisible to it.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub host: String,
    pub default_content_type: String,
    pub max_request_size: u64,
    pub async_request_timeout_ms: u64,
    pub enforce_ssl: bool,
    pub show_banner: bool,
    pub context_path: String,
    pub routing: RoutingConfig,
    pub compression: CompressionStrategy,
}

impl ConfigSnapshot {
    pub(crate) fn new(store: &ConfigStore) -> Self {
        Self {
            host: store.host.clone(),
            default_content_type: store.default_content_type.clone(),
            max_request_size: store.max_request_size,
            async_request_timeout_ms: store.async_request_timeout_ms,
            enforce_ssl: store.enforce_ssl,
            show_banner: store.show_banner,
            context_path: normalize_context_path(&store.context_path),
            routing: store.routing.clone(),
            compression: store.compression,
        }
    }

    /// Request timeout, if one is configured.
    pub fn async_request_timeout(&self) -> Option<Duration> {
        (self.async_request_timeout_ms > 0)
            .then(|| Duration::from_millis(self.async_request_timeout_ms))
    }
}

/// Normalize to a leading-slash path without a trailing slash; empty input
/// maps to the root.
fn normalize_context_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
