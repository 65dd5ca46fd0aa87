//! Mutable configuration store consumed at startup.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::snapshot::ConfigSnapshot;
use crate::error::ShellError;
use crate::http::interceptor::{Interceptor, SslRedirect};
use crate::plugin::registry::{Plugin, PluginRegistry};

/// Compression applied to response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionStrategy {
    None,
    #[default]
    Gzip,
}

/// Path-matching behavior applied before route lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Treat `/path` and `/path/` as the same route.
    pub ignore_trailing_slashes: bool,

    /// Collapse `//` sequences in request paths to a single slash.
    pub treat_multiple_slashes_as_single_slash: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            ignore_trailing_slashes: true,
            treat_multiple_slashes_as_single_slash: false,
        }
    }
}

/// Mutable configuration for an application shell.
///
/// Owned by the caller until `start`; the running instance only ever sees
/// the [`ConfigSnapshot`] frozen from it. Plain fields deserialize from a
/// TOML file; plugins and interceptors can only be added programmatically.
#[derive(Deserialize)]
#[serde(default)]
pub struct ConfigStore {
    /// Address the listener binds to.
    pub host: String,

    /// Content type set on responses that did not pick one themselves.
    pub default_content_type: String,

    /// Maximum request body size in bytes.
    pub max_request_size: u64,

    /// Per-request timeout in milliseconds; `0` means no timeout.
    pub async_request_timeout_ms: u64,

    /// Redirect plaintext requests to `https`.
    pub enforce_ssl: bool,

    /// Log the startup banner once the listener is bound.
    pub show_banner: bool,

    /// Path prefix the application router is mounted under.
    pub context_path: String,

    /// Path-matching options.
    pub routing: RoutingConfig,

    /// Response compression.
    pub compression: CompressionStrategy,

    #[serde(skip)]
    plugins: PluginRegistry,

    #[serde(skip)]
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            default_content_type: "text/plain".to_string(),
            max_request_size: 1_000_000,
            async_request_timeout_ms: 0,
            enforce_ssl: false,
            show_banner: true,
            context_path: "/".to_string(),
            routing: RoutingConfig::default(),
            compression: CompressionStrategy::default(),
            plugins: PluginRegistry::new(),
            interceptors: Vec::new(),
        }
    }
}

impl ConfigStore {
    /// Register a plugin under its identity.
    ///
    /// Fails with [`ShellError::DuplicatePlugin`] when the identity is
    /// already taken; the registry is left unchanged.
    pub fn register_plugin<P: Plugin + 'static>(&mut self, plugin: P) -> Result<(), ShellError> {
        self.plugins.register(Box::new(plugin))
    }

    /// Append an interceptor to the chain.
    pub fn register_interceptor<I: Interceptor + 'static>(&mut self, interceptor: I) {
        self.interceptors.push(Arc::new(interceptor));
    }

    /// Registered plugins.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Interceptor chain in execution order.
    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    /// Freeze the plain configuration values into an immutable snapshot.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(self)
    }

    pub(crate) fn into_parts(self) -> (PluginRegistry, Vec<Arc<dyn Interceptor>>) {
        (self.plugins, self.interceptors)
    }
}

/// Apply a caller-supplied mutation to the store, exactly once.
///
/// Errors raised by `configure` (a duplicate plugin registration, for
/// instance) propagate to the caller and abort shell creation. Once the
/// mutation succeeded and `enforce_ssl` is set, the SSL-redirect interceptor
/// is installed ahead of every interceptor the mutation registered.
pub fn apply_user_config<F>(store: &mut ConfigStore, configure: F) -> Result<(), ShellError>
where
    F: FnOnce(&mut ConfigStore) -> Result<(), ShellError>,
{
    configure(store)?;
    if store.enforce_ssl {
        ensure_ssl_redirect(&mut store.interceptors);
    }
    Ok(())
}

/// Put the SSL-redirect interceptor at the head of the chain.
///
/// Invariant: when `enforce_ssl` is set, [`SslRedirect`] runs before every
/// other interceptor.
pub(crate) fn ensure_ssl_redirect(interceptors: &mut Vec<Arc<dyn Interceptor>>) {
    let already_first = interceptors
        .first()
        .map(|interceptor| interceptor.name() == SslRedirect::NAME)
        .unwrap_or(false);
    if !already_first {
        interceptors.insert(0, Arc::new(SslRedirect));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::registry::PluginContext;

    struct NamedPlugin(&'static str);

    impl Plugin for NamedPlugin {
        fn identity(&self) -> &str {
            self.0
        }

        fn on_activate(&self, _ctx: &mut PluginContext<'_>) -> Result<(), ShellError> {
            Ok(())
        }
    }

    struct NoopInterceptor;

    impl Interceptor for NoopInterceptor {
        fn name(&self) -> &str {
            "noop"
        }

        fn intercept(
            &self,
            _request: &mut axum::extract::Request,
        ) -> Option<axum::response::Response> {
            None
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let store = ConfigStore::default();
        assert_eq!(store.max_request_size, 1_000_000);
        assert_eq!(store.async_request_timeout_ms, 0);
        assert!(!store.enforce_ssl);
        assert_eq!(store.default_content_type, "text/plain");
        assert_eq!(store.context_path, "/");
        assert_eq!(store.compression, CompressionStrategy::Gzip);
        assert!(store.routing.ignore_trailing_slashes);
        assert!(!store.routing.treat_multiple_slashes_as_single_slash);
    }

    #[test]
    fn user_config_is_applied_once_and_errors_propagate() {
        let mut store = ConfigStore::default();
        let result = apply_user_config(&mut store, |config| {
            config.register_plugin(NamedPlugin("metrics"))?;
            config.register_plugin(NamedPlugin("metrics"))?;
            Ok(())
        });

        assert!(matches!(result, Err(ShellError::DuplicatePlugin(_))));
        assert_eq!(store.plugins().len(), 1);
    }

    #[test]
    fn enforce_ssl_installs_redirect_ahead_of_user_interceptors() {
        let mut store = ConfigStore::default();
        apply_user_config(&mut store, |config| {
            config.register_interceptor(NoopInterceptor);
            config.enforce_ssl = true;
            Ok(())
        })
        .unwrap();

        let names: Vec<&str> = store.interceptors().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec![SslRedirect::NAME, "noop"]);
    }

    #[test]
    fn ssl_redirect_is_not_installed_twice() {
        let mut interceptors: Vec<Arc<dyn Interceptor>> = Vec::new();
        ensure_ssl_redirect(&mut interceptors);
        ensure_ssl_redirect(&mut interceptors);
        assert_eq!(interceptors.len(), 1);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_store_mutation() {
        let mut store = ConfigStore::default();
        let snapshot = store.snapshot();

        store.max_request_size = 5;
        store.context_path = "/changed".to_string();

        assert_eq!(snapshot.max_request_size, 1_000_000);
        assert_eq!(snapshot.context_path, "/");
    }
}
