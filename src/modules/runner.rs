//! The shared evaluation engine behind every domain module.
//!
//! Filters the catalog down to the applicable rules, assembles the chunked
//! prompt, dispatches through the gateway, then validates every candidate
//! the model returned: unknown rule ids and out-of-range pages are dropped,
//! severity always comes from the catalog rule, and duplicate
//! (rule, page) claims collapse to one violation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::catalog::{
    applicable, filter_applicable, ComplianceContext, ModuleKind, RuleRegistry, Violation,
};
use crate::document::Document;
use crate::gateway::ModelGateway;
use crate::modules::findings::FindingsResponse;
use crate::modules::prompt::{build_frame, REVIEW_SYSTEM_PROMPT};
use crate::modules::{DomainModule, ModuleError};

/// Result of one module evaluation, violations plus diagnostics.
#[derive(Debug)]
pub struct ModuleOutcome {
    pub module: ModuleKind,
    pub violations: Vec<Violation>,
    /// Rules that survived applicability filtering for this job.
    pub rules_evaluated: usize,
    /// Candidates dropped because the model cited an unknown rule id or an
    /// out-of-range page.
    pub discarded: usize,
    pub duration_ms: u64,
}

/// Shared engine; one instance serves all domains and all jobs.
pub struct ModuleRunner {
    gateway: Arc<ModelGateway>,
    registry: Arc<RuleRegistry>,
}

impl ModuleRunner {
    pub fn new(gateway: Arc<ModelGateway>, registry: Arc<RuleRegistry>) -> Self {
        Self { gateway, registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Evaluate one domain over the whole document. Idempotent with respect
    /// to the registry and document: nothing shared is mutated.
    pub fn evaluate(
        &self,
        module: &dyn DomainModule,
        document: &Document,
        context: &ComplianceContext,
        reference: Option<&str>,
        cancel: &AtomicBool,
    ) -> Result<ModuleOutcome, ModuleError> {
        let started = Instant::now();
        let kind = module.kind();

        if cancel.load(Ordering::SeqCst) {
            return Err(ModuleError::Cancelled);
        }

        let rules = filter_applicable(self.registry.rules_for(kind), context);
        tracing::info!(
            module = kind.as_str(),
            catalog_rules = self.registry.rules_for(kind).len(),
            applicable = rules.len(),
            "Evaluating module"
        );

        // No applicable rules means nothing can be violated; skip the LLM.
        if rules.is_empty() {
            return Ok(ModuleOutcome {
                module: kind,
                violations: Vec::new(),
                rules_evaluated: 0,
                discarded: 0,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        let frame = build_frame(module, &rules, document, reference);
        let response = self
            .gateway
            .complete_chunked(REVIEW_SYSTEM_PROMPT, &frame, cancel, FindingsResponse::merge)
            .map_err(|e| match e {
                crate::gateway::ModelError::Cancelled => ModuleError::Cancelled,
                other => ModuleError::Model(other),
            })?;

        let (violations, discarded) = self.validate(kind, document, context, response);
        tracing::info!(
            module = kind.as_str(),
            violations = violations.len(),
            discarded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Module evaluation complete"
        );

        Ok(ModuleOutcome {
            module: kind,
            violations,
            rules_evaluated: rules.len(),
            discarded,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn validate(
        &self,
        kind: ModuleKind,
        document: &Document,
        context: &ComplianceContext,
        response: FindingsResponse,
    ) -> (Vec<Violation>, usize) {
        let page_count = document.page_count() as u32;
        let mut seen: HashSet<(String, u32)> = HashSet::new();
        let mut violations = Vec::new();
        let mut discarded = 0;

        for candidate in response.violations {
            let Some(rule) = self.registry.get(kind, &candidate.rule_id) else {
                tracing::warn!(
                    module = kind.as_str(),
                    rule_id = candidate.rule_id.as_str(),
                    "Discarding finding with unknown rule id"
                );
                discarded += 1;
                continue;
            };
            // The prompt only listed applicable rules, but the model may
            // still cite a catalog id that fails the predicate for this job.
            if !applicable(rule, context) {
                tracing::warn!(
                    module = kind.as_str(),
                    rule_id = candidate.rule_id.as_str(),
                    "Discarding finding for rule not applicable to this context"
                );
                discarded += 1;
                continue;
            }
            if candidate.page_number == 0 || candidate.page_number > page_count {
                tracing::warn!(
                    module = kind.as_str(),
                    rule_id = candidate.rule_id.as_str(),
                    page = candidate.page_number,
                    "Discarding finding with out-of-range page"
                );
                discarded += 1;
                continue;
            }
            if !seen.insert((candidate.rule_id.clone(), candidate.page_number)) {
                continue;
            }
            violations.push(Violation {
                rule_id: candidate.rule_id,
                module: kind,
                page_number: candidate.page_number,
                severity: rule.severity,
                description: candidate.description,
                suggested_action: candidate.suggested_action,
            });
        }

        violations.sort_by(|a, b| {
            (a.page_number, a.severity.rank(), a.rule_id.as_str()).cmp(&(
                b.page_number,
                b.severity.rank(),
                b.rule_id.as_str(),
            ))
        });
        (violations, discarded)
    }
}
