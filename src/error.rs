//! Error taxonomy for the shell surface.

use thiserror::Error;

use crate::config::loader::ConfigError;

/// Errors surfaced by shell creation and startup.
#[derive(Debug, Error)]
pub enum ShellError {
    /// A plugin with the same identity is already registered. Recoverable;
    /// the registry is left unchanged.
    #[error("plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    /// The listener could not be bound. Fatal to the start attempt; the
    /// shell lands in its terminal state.
    #[error("failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// `start()` while another start is in progress or the shell is already
    /// running.
    #[error("server is already starting or running")]
    AlreadyStarting,

    /// `start()` after the shell reached its terminal state.
    #[error("server has already been stopped")]
    AlreadyStopped,

    /// A plugin activation hook failed. Startup is aborted; previously
    /// activated plugins are not rolled back.
    #[error("plugin '{identity}' failed to activate")]
    PluginActivation {
        identity: String,
        #[source]
        source: Box<ShellError>,
    },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failure raised inside a plugin.
    #[error("plugin error: {0}")]
    Plugin(String),
}
