//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! ConfigStore::default()
//!     → optional TOML file overlay (loader.rs)
//!     → user mutation, applied exactly once (store.rs)
//!     → ConfigSnapshot frozen at start (snapshot.rs)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - The store is mutable only until `start`; the running instance reads an
//!   immutable snapshot
//! - All fields have defaults to allow a fully empty config file
//! - Plugins and interceptors live in the store but never in the snapshot

pub mod loader;
pub mod snapshot;
pub mod store;

pub use snapshot::ConfigSnapshot;
pub use store::{apply_user_config, CompressionStrategy, ConfigStore, RoutingConfig};
