//! ExtractionManager — turns a raw deck into the canonical [`Document`]
//! through one of four interchangeable strategies.
//!
//! Strategy selection is a per-job configuration input; the orchestrator is
//! strategy-agnostic. All strategies produce the identical Document schema.
//! Any extraction failure is unrecoverable for the job — no partial
//! Document is ever accepted.

pub mod exhaustive;
pub mod manager;
pub mod multi_agent;
pub mod parallel;
pub mod raw;
pub mod schema;
pub mod standard;

pub use manager::*;
pub use raw::*;

use thiserror::Error;

use crate::document::DocumentError;
use crate::gateway::ModelError;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Malformed deck input: {0}")]
    Malformed(String),

    #[error("Document invariant violated: {0}")]
    Document(#[from] DocumentError),

    #[error("LLM extraction failed: {0}")]
    Model(#[from] ModelError),

    #[error("Extraction worker failed: {0}")]
    Worker(String),
}
