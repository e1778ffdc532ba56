//! Consolidated violation report.
//!
//! Statistics and the text summary are pure views over the one violation
//! list; there is no second computation path to drift out of sync.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{ModuleKind, Severity, Violation};
use crate::modules::ModuleOutcome;

/// A module that could not complete its evaluation. The job still completes
/// as long as at least one module succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleFailure {
    pub module: ModuleKind,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub critical: usize,
    pub major: usize,
    pub minor: usize,
    /// Violation counts keyed by module name, sorted for stable output.
    pub by_module: BTreeMap<String, usize>,
}

impl Statistics {
    fn over(violations: &[Violation]) -> Self {
        let mut by_module = BTreeMap::new();
        let mut critical = 0;
        let mut major = 0;
        let mut minor = 0;
        for v in violations {
            *by_module.entry(v.module.as_str().to_string()).or_insert(0) += 1;
            match v.severity {
                Severity::Critical => critical += 1,
                Severity::Major => major += 1,
                Severity::Minor => minor += 1,
            }
        }
        Self {
            total: violations.len(),
            critical,
            major,
            minor,
            by_module,
        }
    }
}

/// The final output of a completed job.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub catalog_version: String,
    pub violations: Vec<Violation>,
    pub statistics: Statistics,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub module_failures: Vec<ModuleFailure>,
}

impl ComplianceReport {
    /// Merge per-module outcomes into one report, ordered by
    /// (page, severity rank, module).
    pub fn consolidate(
        catalog_version: &str,
        outcomes: Vec<ModuleOutcome>,
        module_failures: Vec<ModuleFailure>,
    ) -> Self {
        let mut violations: Vec<Violation> = outcomes
            .into_iter()
            .flat_map(|o| o.violations)
            .collect();
        violations.sort_by(|a, b| {
            (a.page_number, a.severity.rank(), a.module.as_str()).cmp(&(
                b.page_number,
                b.severity.rank(),
                b.module.as_str(),
            ))
        });
        let statistics = Statistics::over(&violations);
        Self {
            catalog_version: catalog_version.to_string(),
            violations,
            statistics,
            module_failures,
        }
    }

    /// Flat textual rendering of the same violation list.
    pub fn text_summary(&self) -> String {
        let mut out = format!(
            "Compliance report (catalog {}): {} violation(s) — {} critical, {} major, {} minor\n",
            self.catalog_version,
            self.statistics.total,
            self.statistics.critical,
            self.statistics.major,
            self.statistics.minor,
        );
        for v in &self.violations {
            out.push_str(&format!(
                "  page {:>3}  [{}] {} ({}): {}\n",
                v.page_number,
                v.severity,
                v.rule_id,
                v.module,
                v.description
            ));
            if let Some(action) = &v.suggested_action {
                out.push_str(&format!("            fix: {action}\n"));
            }
        }
        for f in &self.module_failures {
            out.push_str(&format!(
                "  module '{}' did not complete: {}\n",
                f.module, f.error
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(module: ModuleKind, rule_id: &str, page: u32, severity: Severity) -> Violation {
        Violation {
            rule_id: rule_id.into(),
            module,
            page_number: page,
            severity,
            description: format!("{rule_id} not satisfied"),
            suggested_action: None,
        }
    }

    fn outcome(module: ModuleKind, violations: Vec<Violation>) -> ModuleOutcome {
        ModuleOutcome {
            module,
            violations,
            rules_evaluated: 3,
            discarded: 0,
            duration_ms: 1,
        }
    }

    #[test]
    fn consolidation_orders_by_page_severity_module() {
        // Outcomes arrive in arbitrary module order; the report re-sorts.
        let perf = outcome(
            ModuleKind::Performance,
            vec![
                violation(ModuleKind::Performance, "P.1", 5, Severity::Major),
                violation(ModuleKind::Performance, "P.2", 1, Severity::Minor),
            ],
        );
        let disc = outcome(
            ModuleKind::Disclaimers,
            vec![
                violation(ModuleKind::Disclaimers, "1.1", 1, Severity::Critical),
                violation(ModuleKind::Disclaimers, "1.5", 5, Severity::Major),
            ],
        );
        let report = ComplianceReport::consolidate("2026.08", vec![perf, disc], vec![]);

        let order: Vec<(u32, Severity, ModuleKind)> = report
            .violations
            .iter()
            .map(|v| (v.page_number, v.severity, v.module))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, Severity::Critical, ModuleKind::Disclaimers),
                (1, Severity::Minor, ModuleKind::Performance),
                (5, Severity::Major, ModuleKind::Disclaimers),
                (5, Severity::Major, ModuleKind::Performance),
            ]
        );
    }

    #[test]
    fn statistics_are_a_view_over_the_violation_list() {
        let report = ComplianceReport::consolidate(
            "t",
            vec![outcome(
                ModuleKind::Esg,
                vec![
                    violation(ModuleKind::Esg, "E.1", 1, Severity::Critical),
                    violation(ModuleKind::Esg, "E.2", 2, Severity::Critical),
                    violation(ModuleKind::Esg, "E.3", 3, Severity::Minor),
                ],
            )],
            vec![],
        );
        assert_eq!(report.statistics.total, 3);
        assert_eq!(report.statistics.critical, 2);
        assert_eq!(report.statistics.major, 0);
        assert_eq!(report.statistics.minor, 1);
        assert_eq!(report.statistics.by_module.get("esg"), Some(&3));
    }

    #[test]
    fn empty_outcomes_give_clean_report() {
        let report = ComplianceReport::consolidate("t", vec![], vec![]);
        assert_eq!(report.statistics.total, 0);
        assert!(report.violations.is_empty());
        assert!(report.text_summary().contains("0 violation(s)"));
    }

    #[test]
    fn text_summary_lists_every_violation_and_failure() {
        let report = ComplianceReport::consolidate(
            "2026.08",
            vec![outcome(
                ModuleKind::Disclaimers,
                vec![Violation {
                    rule_id: "1.1".into(),
                    module: ModuleKind::Disclaimers,
                    page_number: 2,
                    severity: Severity::Critical,
                    description: "Missing capital-at-risk warning".into(),
                    suggested_action: Some("Add the standard warning".into()),
                }],
            )],
            vec![ModuleFailure {
                module: ModuleKind::Esg,
                error: "all providers exhausted".into(),
            }],
        );
        let text = report.text_summary();
        assert!(text.contains("1 violation(s)"));
        assert!(text.contains("Missing capital-at-risk warning"));
        assert!(text.contains("fix: Add the standard warning"));
        assert!(text.contains("module 'esg' did not complete"));
    }

    #[test]
    fn failures_omitted_from_json_when_empty() {
        let report = ComplianceReport::consolidate("t", vec![], vec![]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("module_failures"));
    }
}
