//! Plugin registry with identity uniqueness and ordered activation.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::snapshot::ConfigSnapshot;
use crate::error::ShellError;
use crate::http::interceptor::Interceptor;

/// A named extension activated during startup.
pub trait Plugin: Send + Sync {
    /// Stable identity used to prevent double registration.
    fn identity(&self) -> &str;

    /// Activation hook, invoked once during `start` in registration order.
    fn on_activate(&self, ctx: &mut PluginContext<'_>) -> Result<(), ShellError>;
}

struct PluginEntry {
    identity: String,
    plugin: Box<dyn Plugin>,
}

/// Keyed plugin collection preserving insertion order.
///
/// Mutated only before the shell starts; read-only afterwards.
#[derive(Default)]
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin under its identity.
    ///
    /// Fails with [`ShellError::DuplicatePlugin`] when the identity already
    /// exists; the registry is left unchanged.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), ShellError> {
        let identity = plugin.identity().to_string();
        if self.contains(&identity) {
            return Err(ShellError::DuplicatePlugin(identity));
        }
        debug!(plugin = %identity, "plugin registered");
        self.entries.push(PluginEntry { identity, plugin });
        Ok(())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.iter().any(|entry| entry.identity == identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered identities in insertion order.
    pub fn identities(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.identity.as_str()).collect()
    }

    /// Activate every plugin in insertion order.
    ///
    /// Stops at the first failure; plugins activated before it are not
    /// rolled back.
    pub fn activate_all(&self, ctx: &mut PluginContext<'_>) -> Result<(), ShellError> {
        for entry in &self.entries {
            entry
                .plugin
                .on_activate(ctx)
                .map_err(|source| ShellError::PluginActivation {
                    identity: entry.identity.clone(),
                    source: Box::new(source),
                })?;
            info!(plugin = %entry.identity, "plugin activated");
        }
        Ok(())
    }
}

/// Capabilities handed to a plugin during activation.
pub struct PluginContext<'a> {
    snapshot: &'a ConfigSnapshot,
    interceptors: &'a mut Vec<Arc<dyn Interceptor>>,
}

impl<'a> PluginContext<'a> {
    pub(crate) fn new(
        snapshot: &'a ConfigSnapshot,
        interceptors: &'a mut Vec<Arc<dyn Interceptor>>,
    ) -> Self {
        Self {
            snapshot,
            interceptors,
        }
    }

    /// Frozen configuration of the starting instance.
    pub fn config(&self) -> &ConfigSnapshot {
        self.snapshot
    }

    /// Append a request interceptor to the chain.
    pub fn register_interceptor<I: Interceptor + 'static>(&mut self, interceptor: I) {
        self.interceptors.push(Arc::new(interceptor));
    }
}
