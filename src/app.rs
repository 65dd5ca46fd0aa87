//! Application shell façade.
//!
//! Composes the configuration store, plugin registry, lifecycle controller
//! and request tracker behind the `create` / `start` / `stop` / `port`
//! surface.

use std::sync::{Arc, Mutex, OnceLock};

use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::snapshot::ConfigSnapshot;
use crate::config::store::{apply_user_config, ensure_ssl_redirect, ConfigStore};
use crate::error::ShellError;
use crate::http::server::HttpServer;
use crate::lifecycle::controller::{LifecycleController, LifecycleState};
use crate::lifecycle::tracker::RequestTracker;
use crate::plugin::registry::PluginContext;

/// An embeddable HTTP application.
///
/// Wrap it in an [`Arc`] to drive `start` and `stop` from different tasks.
pub struct AppShell {
    config: Mutex<Option<ConfigStore>>,
    routes: Mutex<Option<Router>>,
    snapshot: OnceLock<Arc<ConfigSnapshot>>,
    tracker: RequestTracker,
    lifecycle: LifecycleController,
}

impl AppShell {
    /// Shell with default configuration.
    pub fn new() -> Self {
        Self::with_store(ConfigStore::default())
    }

    /// Shell with default configuration mutated once by `configure`.
    ///
    /// Errors raised inside `configure`, a duplicate plugin registration
    /// for instance, abort creation.
    pub fn create<F>(configure: F) -> Result<Self, ShellError>
    where
        F: FnOnce(&mut ConfigStore) -> Result<(), ShellError>,
    {
        let mut store = ConfigStore::default();
        apply_user_config(&mut store, configure)?;
        Ok(Self::with_store(store))
    }

    /// Shell around an existing store, e.g. one loaded from a file.
    pub fn with_store(store: ConfigStore) -> Self {
        let tracker = RequestTracker::new();
        Self {
            config: Mutex::new(Some(store)),
            routes: Mutex::new(None),
            snapshot: OnceLock::new(),
            lifecycle: LifecycleController::new(tracker.clone()),
            tracker,
        }
    }

    /// Install the application's router. Pre-start only.
    pub fn routes(self, router: Router) -> Self {
        *self.routes.lock().unwrap() = Some(router);
        self
    }

    /// Freeze the configuration, activate plugins, bind the listener and
    /// transition to `Running`.
    ///
    /// Port `0` requests an OS-assigned ephemeral port; the resolved port is
    /// available from [`port`](Self::port) afterwards. Exactly one
    /// concurrent caller wins the transition; the others fail with
    /// [`ShellError::AlreadyStarting`]. A failed attempt is terminal.
    pub async fn start(&self, port: u16) -> Result<(), ShellError> {
        self.lifecycle.begin_start()?;

        let store = self.config.lock().unwrap().take();
        let Some(store) = store else {
            self.lifecycle.abort_start();
            return Err(ShellError::AlreadyStopped);
        };

        let snapshot = Arc::new(store.snapshot());
        let (registry, mut interceptors) = store.into_parts();

        {
            let mut context = PluginContext::new(&snapshot, &mut interceptors);
            if let Err(error) = registry.activate_all(&mut context) {
                self.lifecycle.abort_start();
                return Err(error);
            }
        }
        if snapshot.enforce_ssl {
            ensure_ssl_redirect(&mut interceptors);
        }

        let addr = format!("{}:{}", snapshot.host, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.lifecycle.abort_start();
                return Err(ShellError::Bind { addr, source });
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(local_addr) => local_addr,
            Err(source) => {
                self.lifecycle.abort_start();
                return Err(ShellError::Bind { addr, source });
            }
        };

        let router = self.routes.lock().unwrap().take().unwrap_or_default();
        let server = HttpServer::new(
            Arc::clone(&snapshot),
            interceptors,
            self.tracker.clone(),
            router,
        );

        // Subscribe before the state flips so a racing stop() cannot fire
        // the close signal into the void.
        let close = self.lifecycle.subscribe();
        let serve = tokio::spawn(async move {
            if let Err(error) = server.run(listener, close).await {
                error!(%error, "http server terminated abnormally");
            }
        });

        if let Err(error) = self.lifecycle.mark_running(local_addr, serve) {
            // stop() won the race during Starting; tear the serve task down
            self.lifecycle.request_close();
            return Err(error);
        }

        let _ = self.snapshot.set(Arc::clone(&snapshot));

        if snapshot.show_banner {
            info!(
                address = %local_addr,
                context_path = %snapshot.context_path,
                version = env!("CARGO_PKG_VERSION"),
                "application shell listening"
            );
        }
        Ok(())
    }

    /// Resolved listening port, available only while `Running`.
    pub fn port(&self) -> Option<u16> {
        self.lifecycle.port()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Frozen configuration of the running instance.
    pub fn config(&self) -> Option<Arc<ConfigSnapshot>> {
        self.snapshot.get().cloned()
    }

    /// Tracker that request-handling collaborators register with.
    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Stop the shell and wait until it is `Stopped`.
    ///
    /// See [`LifecycleController::stop`] for the drain semantics.
    pub async fn stop(&self) {
        self.lifecycle.stop().await;
    }
}

impl Default for AppShell {
    fn default() -> Self {
        Self::new()
    }
}
