//! Raw deck payload — the decoded form of the upload boundary's bytes.
//!
//! The upload layer (out of scope) converts the original office format into
//! this per-page JSON interchange; extraction strategies work from it.

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// A deck as received from the input boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDeck {
    pub file_name: String,
    pub pages: Vec<RawPage>,
}

/// One raw page: unstructured text plus any speaker notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RawDeck {
    /// Decode the upload payload. Malformed bytes or an empty page list are
    /// unrecoverable for the job.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractionError> {
        let deck: RawDeck = serde_json::from_slice(bytes)
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?;
        if deck.pages.is_empty() {
            return Err(ExtractionError::Malformed("deck has no pages".into()));
        }
        Ok(deck)
    }
}
