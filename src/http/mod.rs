//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, path normalization)
//!     → interceptor.rs (pre-routing interceptor chain)
//!     → application router (user-supplied handlers)
//!     → response (default content type, compression)
//! ```

pub mod interceptor;
pub mod request;
pub mod server;

pub use interceptor::{Interceptor, SslRedirect};
pub use server::HttpServer;
