//! Rule catalog: canonical rule identifiers, the registry index, and the
//! context-driven applicability filter.
//!
//! The registry is the single source of truth for valid rule ids. It is
//! loaded once at startup from a versioned JSON catalog and shared read-only
//! (`Arc`) by every compliance module for the lifetime of the process.

pub mod filter;
pub mod registry;
pub mod types;

pub use filter::*;
pub use registry::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed catalog JSON: {0}")]
    Json(String),

    #[error("Duplicate rule id '{rule_id}' in module '{module}'")]
    DuplicateRule { module: String, rule_id: String },

    #[error("Catalog contains no rules")]
    Empty,
}
