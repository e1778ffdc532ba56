//! Compliance modules: one domain expert per rule family, all sharing one
//! evaluation engine.
//!
//! A domain module contributes its [`ModuleKind`] and reviewer guidance; the
//! [`runner::ModuleRunner`] does everything else — rule filtering, prompt
//! assembly, chunked LLM dispatch, and validation of what the model claims.

pub mod domains;
pub mod findings;
pub mod prompt;
pub mod runner;

pub use domains::*;
pub use runner::*;

use thiserror::Error;

use crate::gateway::ModelError;

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Model evaluation failed: {0}")]
    Model(#[from] ModelError),

    #[error("Job cancelled")]
    Cancelled,
}

/// A compliance domain. Implementations are stateless; everything per-job
/// flows through the runner.
pub trait DomainModule: Send + Sync {
    fn kind(&self) -> crate::catalog::ModuleKind;

    /// Domain-specific reviewer guidance injected into the prompt header.
    fn guidance(&self) -> &'static str;
}
