//! ModelGateway — LLM access with ordered provider fallback, token-aware
//! chunking, bounded retry/backoff, and structured-output validation.
//!
//! Callers never talk to a provider directly: they hand the gateway a
//! system prompt plus either a single prompt or a chunkable prompt frame,
//! and receive a typed, schema-validated result or a `ModelError`.

pub mod chunking;
pub mod gateway;
pub mod provider;

pub use chunking::*;
pub use gateway::*;
pub use provider::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("No LLM providers configured")]
    NoProviders,

    #[error("All providers exhausted; last error: {last_error}")]
    AllProvidersExhausted { last_error: String },

    #[error("LLM output unparsable after {attempts} attempts: {detail}")]
    ResponseFormat { attempts: u32, detail: String },

    #[error("Completion cancelled before dispatch")]
    Cancelled,
}
