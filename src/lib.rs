//! Embeddable HTTP Application Shell Library

pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod plugin;

pub use app::AppShell;
pub use config::snapshot::ConfigSnapshot;
pub use config::store::{apply_user_config, CompressionStrategy, ConfigStore, RoutingConfig};
pub use error::ShellError;
pub use http::interceptor::{Interceptor, SslRedirect};
pub use lifecycle::controller::LifecycleState;
pub use lifecycle::tracker::{RequestHandle, RequestTracker, TrackerError};
pub use plugin::registry::{Plugin, PluginContext, PluginRegistry};
