//! Job execution: the state machine from `pending` to a terminal state.
//!
//! One worker thread per job. A module failure is recorded and the
//! remaining modules proceed; the job only fails when extraction fails or
//! every selected module fails. Cancellation is observed between phases and
//! between modules, never mid-request.

use std::sync::Arc;

use uuid::Uuid;

use crate::extraction::{ExtractionManager, RawDeck};
use crate::modules::{default_modules, DomainModule, ModuleError, ModuleRunner};
use crate::orchestrator::job::{JobHandle, JobRegistry, JobRequest, JobStatus};
use crate::orchestrator::report::{ComplianceReport, ModuleFailure};

pub struct Orchestrator {
    extraction: Arc<ExtractionManager>,
    runner: Arc<ModuleRunner>,
    modules: Arc<Vec<Box<dyn DomainModule>>>,
    jobs: Arc<JobRegistry>,
}

impl Orchestrator {
    pub fn new(extraction: Arc<ExtractionManager>, runner: Arc<ModuleRunner>) -> Self {
        Self {
            extraction,
            runner,
            modules: Arc::new(default_modules()),
            jobs: Arc::new(JobRegistry::new()),
        }
    }

    pub fn jobs(&self) -> &Arc<JobRegistry> {
        &self.jobs
    }

    /// Register a job and run it on a background thread. Returns the job id
    /// for polling.
    pub fn submit(&self, request: JobRequest) -> Uuid {
        let handle = self.jobs.create(&request);
        let id = handle.snapshot().id;

        let extraction = self.extraction.clone();
        let runner = self.runner.clone();
        let modules = self.modules.clone();
        let worker_handle = handle.clone();
        let worker = std::thread::Builder::new()
            .name(format!("job-{id}"))
            .spawn(move || run_job(&extraction, &runner, &modules, &worker_handle, request));
        if let Err(e) = worker {
            tracing::error!(job = %id, error = %e, "Failed to spawn job worker");
            handle.fail(format!("failed to spawn job worker: {e}"));
        }
        id
    }

    /// Run a job synchronously on the caller's thread. Same state machine
    /// as [`submit`](Self::submit); used by CLIs and tests.
    pub fn run_blocking(&self, request: JobRequest) -> crate::orchestrator::Job {
        let handle = self.jobs.create(&request);
        run_job(&self.extraction, &self.runner, &self.modules, &handle, request);
        handle.snapshot()
    }
}

fn run_job(
    extraction: &ExtractionManager,
    runner: &ModuleRunner,
    modules: &[Box<dyn DomainModule>],
    handle: &JobHandle,
    request: JobRequest,
) {
    let job = handle.snapshot();
    tracing::info!(
        job = %job.id,
        modules = job.selected_modules.len(),
        method = job.extraction_method.as_str(),
        "Job started"
    );

    // ─── extracting ───
    handle.set_status(JobStatus::Extracting, "extracting deck");
    let raw = match RawDeck::from_bytes(&request.deck) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(job = %job.id, error = %e, "Deck decode failed");
            handle.fail(e.to_string());
            return;
        }
    };
    let document = match extraction.extract(&raw, job.extraction_method) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::error!(job = %job.id, error = %e, "Extraction failed");
            handle.fail(e.to_string());
            return;
        }
    };

    // ─── validating ───
    handle.set_status(JobStatus::Validating, "validating");
    let selected = &job.selected_modules;
    let total = selected.len();
    let mut outcomes = Vec::new();
    let mut failures = Vec::new();

    for (done, module) in modules
        .iter()
        .filter(|m| selected.contains(&m.kind()))
        .enumerate()
    {
        if handle.is_cancelled() {
            handle.set_status(JobStatus::Cancelled, "cancelled");
            return;
        }
        handle.set_message(module.kind().as_str());

        match runner.evaluate(
            module.as_ref(),
            &document,
            &job.context,
            request.reference_document.as_deref(),
            handle.cancel_flag(),
        ) {
            Ok(outcome) => outcomes.push(outcome),
            Err(ModuleError::Cancelled) => {
                handle.set_status(JobStatus::Cancelled, "cancelled");
                return;
            }
            Err(ModuleError::Model(e)) => {
                tracing::warn!(
                    job = %job.id,
                    module = module.kind().as_str(),
                    error = %e,
                    "Module failed; continuing with remaining modules"
                );
                failures.push(ModuleFailure {
                    module: module.kind(),
                    error: e.to_string(),
                });
            }
        }
        handle.set_progress((((done + 1) * 100) / total.max(1)) as u8);
    }

    if outcomes.is_empty() && !failures.is_empty() {
        handle.fail(format!(
            "all {} selected module(s) failed; last error: {}",
            total,
            failures.last().map(|f| f.error.as_str()).unwrap_or("")
        ));
        return;
    }

    // ─── consolidating ───
    handle.set_status(JobStatus::Consolidating, "consolidating");
    let report =
        ComplianceReport::consolidate(runner.registry().version(), outcomes, failures);
    tracing::info!(
        job = %job.id,
        violations = report.statistics.total,
        failures = report.module_failures.len(),
        "Job completed"
    );
    handle.complete(report);
}
