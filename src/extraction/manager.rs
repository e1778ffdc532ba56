//! Strategy selection and dispatch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::extraction::exhaustive::ExtractionCache;
use crate::extraction::raw::RawDeck;
use crate::extraction::{exhaustive, multi_agent, parallel, standard, ExtractionError};
use crate::gateway::ModelGateway;

/// The four interchangeable extraction strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Deterministic single pass, no LLM. Fastest, lowest fidelity.
    Standard,
    /// Draft LLM pass plus reviewer pass per page. Slowest, highest fidelity.
    MultiAgent,
    /// Per-field LLM calls memoized on page content. Efficient on re-runs.
    ExhaustiveCached,
    /// Single-pass LLM extraction across a bounded worker pool.
    Parallel,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::MultiAgent => "multi_agent",
            Self::ExhaustiveCached => "exhaustive_cached",
            Self::Parallel => "parallel",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "multi_agent" => Some(Self::MultiAgent),
            "exhaustive_cached" => Some(Self::ExhaustiveCached),
            "parallel" => Some(Self::Parallel),
            _ => None,
        }
    }

    pub fn all() -> &'static [ExtractionMethod] {
        &[
            Self::Standard,
            Self::MultiAgent,
            Self::ExhaustiveCached,
            Self::Parallel,
        ]
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Worker threads for the parallel strategy.
    pub parallel_workers: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { parallel_workers: 4 }
    }
}

/// Entry point for deck extraction. Owns the memo cache shared by
/// exhaustive runs; every strategy produces the same canonical schema.
pub struct ExtractionManager {
    gateway: Arc<ModelGateway>,
    config: ExtractionConfig,
    cache: ExtractionCache,
}

impl ExtractionManager {
    pub fn new(gateway: Arc<ModelGateway>, config: ExtractionConfig) -> Self {
        Self {
            gateway,
            config,
            cache: ExtractionCache::new(),
        }
    }

    pub fn extract(
        &self,
        raw: &RawDeck,
        method: ExtractionMethod,
    ) -> Result<Document, ExtractionError> {
        let started = std::time::Instant::now();
        tracing::info!(
            file = raw.file_name.as_str(),
            pages = raw.pages.len(),
            method = method.as_str(),
            "Extracting deck"
        );

        let result = match method {
            ExtractionMethod::Standard => standard::extract(raw),
            ExtractionMethod::MultiAgent => multi_agent::extract(&self.gateway, raw),
            ExtractionMethod::ExhaustiveCached => {
                exhaustive::extract(&self.gateway, &self.cache, raw)
            }
            ExtractionMethod::Parallel => {
                parallel::extract(&self.gateway, raw, self.config.parallel_workers)
            }
        };

        match &result {
            Ok(doc) => tracing::info!(
                pages = doc.page_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Extraction complete"
            ),
            Err(e) => tracing::error!(error = %e, "Extraction failed"),
        }
        result
    }
}
