//! Observability for the shell.
//!
//! Logging goes through `tracing`; the embedding application installs its
//! own subscriber. Metrics go through the `metrics` facade; the embedding
//! application decides whether to install a recorder and which exporter to
//! use.

pub mod metrics;
