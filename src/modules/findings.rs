//! Wire types for what the model reports back.
//!
//! Candidates are untrusted: rule ids and page numbers are validated by the
//! runner against the registry and the document before anything becomes a
//! [`crate::catalog::Violation`].

use serde::{Deserialize, Deserializer};

/// Top-level response schema for a module evaluation chunk.
#[derive(Debug, Default, Deserialize)]
pub struct FindingsResponse {
    #[serde(default)]
    pub violations: Vec<FindingCandidate>,
}

impl FindingsResponse {
    /// Merge policy for chunked completion: concatenate in chunk order.
    pub fn merge(parts: Vec<FindingsResponse>) -> FindingsResponse {
        FindingsResponse {
            violations: parts.into_iter().flat_map(|p| p.violations).collect(),
        }
    }
}

/// One unvalidated finding from the model.
#[derive(Debug, Clone, Deserialize)]
pub struct FindingCandidate {
    pub rule_id: String,
    /// Models emit pages as numbers, numeric strings, or "page 3"; accept
    /// all three. Unparsable forms become 0 and fail range validation.
    #[serde(deserialize_with = "flexible_page_number")]
    pub page_number: u32,
    pub description: String,
    #[serde(default)]
    pub suggested_action: Option<String>,
}

fn flexible_page_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PageRepr {
        Number(i64),
        Text(String),
    }

    Ok(match PageRepr::deserialize(deserializer)? {
        PageRepr::Number(n) => u32::try_from(n).unwrap_or(0),
        PageRepr::Text(s) => s
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .unwrap_or(0),
    })
}
