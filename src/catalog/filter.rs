//! RuleFilter — pure, context-driven applicability evaluation.
//!
//! Must run before any rule is included in an LLM prompt. This is a hard
//! precondition, not an optimization: a professional-only rule surfacing on
//! a retail job would be a misleading result, not just a wasted token.
//! No I/O, fully deterministic.

use super::types::{Applicability, ComplianceContext, Rule};

/// Evaluate a rule's applicability predicate against the job context.
pub fn applicable(rule: &Rule, context: &ComplianceContext) -> bool {
    predicate_matches(&rule.applies_to, context)
}

/// Keep only the rules that apply to the job context, preserving catalog
/// order.
pub fn filter_applicable<'a>(rules: &'a [Rule], context: &ComplianceContext) -> Vec<&'a Rule> {
    rules.iter().filter(|r| applicable(r, context)).collect()
}

fn predicate_matches(applies_to: &Applicability, context: &ComplianceContext) -> bool {
    if let Some(client_types) = &applies_to.client_types {
        if !client_types.contains(&context.client_type) {
            return false;
        }
    }
    if let Some(countries) = &applies_to.countries {
        if !countries
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&context.country))
        {
            return false;
        }
    }
    if let Some(document_types) = &applies_to.document_types {
        if !document_types.contains(&context.document_type) {
            return false;
        }
    }
    true
}
