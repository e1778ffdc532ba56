//! Core catalog types: severity, compliance domains, rules, and the
//! per-job compliance context.

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════
// Severity
// ═══════════════════════════════════════════

/// Importance ranking of a rule or violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Major => "major",
            Self::Minor => "minor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Self::Critical),
            "major" => Some(Self::Major),
            "minor" => Some(Self::Minor),
            _ => None,
        }
    }

    /// Sort rank: critical orders before major orders before minor.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Major => 1,
            Self::Minor => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Compliance domains
// ═══════════════════════════════════════════

/// The four compliance domains, one module instance each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Structure,
    Esg,
    Disclaimers,
    Performance,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Esg => "esg",
            Self::Disclaimers => "disclaimers",
            Self::Performance => "performance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "structure" => Some(Self::Structure),
            "esg" => Some(Self::Esg),
            "disclaimers" => Some(Self::Disclaimers),
            "performance" => Some(Self::Performance),
            _ => None,
        }
    }

    pub fn all() -> &'static [ModuleKind] {
        &[
            Self::Structure,
            Self::Esg,
            Self::Disclaimers,
            Self::Performance,
        ]
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Compliance context
// ═══════════════════════════════════════════

/// Audience the deck is distributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    Retail,
    Professional,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retail => "retail",
            Self::Professional => "professional",
        }
    }
}

/// Kind of marketing document under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Factsheet,
    Presentation,
    Report,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Factsheet => "factsheet",
            Self::Presentation => "presentation",
            Self::Report => "report",
        }
    }
}

/// Per-job context the rule filter evaluates against. Immutable for the
/// duration of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceContext {
    pub client_type: ClientType,
    /// ISO 3166-1 alpha-2 country code, compared case-insensitively.
    pub country: String,
    pub document_type: DocumentType,
}

// ═══════════════════════════════════════════
// Rules
// ═══════════════════════════════════════════

/// Applicability predicate over the compliance context.
///
/// Each `None` field means "applies to all". A populated field restricts the
/// rule to the listed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Applicability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_types: Option<Vec<ClientType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_types: Option<Vec<DocumentType>>,
}

impl Applicability {
    /// A predicate with no restrictions.
    pub fn any() -> Self {
        Self::default()
    }
}

/// A single compliance rule. Owned by the registry, immutable during a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub applies_to: Applicability,
}

// ═══════════════════════════════════════════
// Violations
// ═══════════════════════════════════════════

/// A validated finding: a specific rule not satisfied on a specific slide.
///
/// `rule_id` is guaranteed by the module runner to exist in the registry for
/// `module`; severity is always the catalog rule's severity. Never mutated
/// after creation, only aggregated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub module: ModuleKind,
    pub page_number: u32,
    pub severity: Severity,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}
