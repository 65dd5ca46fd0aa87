//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (controller.rs):
//!     Freeze config → Activate plugins → Bind listener → Running
//!
//! Shutdown (controller.rs, shutdown.rs):
//!     stop() → Stop accepting → Drain in-flight requests → Stopped
//!
//! Tracking (tracker.rs):
//!     enter() on accept → leave() on completion, possibly from another task
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: close listener, refuse new entries, drain, release
//! - Draining has no deadline; callers layer timeouts externally
//! - Transitions are monotonic; a failed start is terminal

pub mod controller;
pub mod shutdown;
pub mod tracker;

pub use controller::{LifecycleController, LifecycleState};
pub use shutdown::ShutdownSignal;
pub use tracker::{RequestHandle, RequestTracker, TrackerError};
