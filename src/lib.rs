//! Verideck — compliance validation pipeline for financial slide decks.
//!
//! A raw deck is extracted into a canonical [`document::Document`], a
//! configurable set of compliance modules evaluates it against the versioned
//! rule catalog through an LLM gateway with provider fallback, and the
//! orchestrator consolidates per-module findings into one violation report.
//!
//! The surrounding application layer (upload handling, HTTP endpoints, UI)
//! is out of scope: it supplies a [`orchestrator::JobRequest`] and polls the
//! [`orchestrator::JobRegistry`].

pub mod catalog;
pub mod config;
pub mod document;
pub mod extraction;
pub mod gateway;
pub mod modules;
pub mod orchestrator;

use tracing_subscriber::EnvFilter;

/// Crate version, exposed for report headers and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for binaries and integration harnesses.
///
/// Respects `RUST_LOG`; falls back to the crate default filter. Safe to call
/// more than once — later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
