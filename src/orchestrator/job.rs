//! Job state and the polling registry.
//!
//! A job is owned by its worker thread for the duration of the run; external
//! callers only ever see cloned snapshots through the registry. Progress is
//! clamped monotonic, so successive polls of the same job never observe it
//! decrease.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{ComplianceContext, ModuleKind};
use crate::extraction::ExtractionMethod;
use crate::orchestrator::report::ComplianceReport;

/// What the caller submits to start a validation job.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRequest {
    /// Raw deck bytes from the upload boundary.
    pub deck: Vec<u8>,
    /// Optional approved reference material (e.g. a prospectus excerpt) the
    /// modules cross-check claims against.
    #[serde(default)]
    pub reference_document: Option<String>,
    pub context: ComplianceContext,
    /// Modules to run. Empty selects all four.
    #[serde(default)]
    pub selected_modules: Vec<ModuleKind>,
    pub extraction_method: ExtractionMethod,
}

/// Lifecycle states. `cancelled` is terminal alongside `completed` and
/// `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Extracting,
    Validating,
    Consolidating,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Extracting => "extracting",
            Self::Validating => "validating",
            Self::Consolidating => "consolidating",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pollable view of one job.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    /// 0–100, never decreases within a job.
    pub progress: u8,
    /// Human-readable phase note, e.g. the module currently running.
    pub message: String,
    pub selected_modules: Vec<ModuleKind>,
    pub extraction_method: ExtractionMethod,
    pub context: ComplianceContext,
    /// Present once the job completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ComplianceReport>,
    /// Present once the job fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Live job state plus its cancellation flag. Workers mutate through the
/// mutex; pollers clone snapshots out.
pub struct JobHandle {
    state: Mutex<Job>,
    cancel: AtomicBool,
}

impl JobHandle {
    pub fn new(job: Job) -> Self {
        Self {
            state: Mutex::new(job),
            cancel: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> Job {
        self.state.lock().expect("job state lock").clone()
    }

    pub fn cancel_flag(&self) -> &AtomicBool {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn set_status(&self, status: JobStatus, message: impl Into<String>) {
        let mut job = self.state.lock().expect("job state lock");
        job.status = status;
        job.message = message.into();
        if status.is_terminal() {
            job.finished_at = Some(Utc::now());
        }
    }

    /// Monotonic: a lower value than the current progress is ignored.
    pub fn set_progress(&self, progress: u8) {
        let mut job = self.state.lock().expect("job state lock");
        job.progress = job.progress.max(progress.min(100));
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.state.lock().expect("job state lock").message = message.into();
    }

    pub fn complete(&self, report: ComplianceReport) {
        let mut job = self.state.lock().expect("job state lock");
        job.status = JobStatus::Completed;
        job.progress = 100;
        job.message = "completed".into();
        job.report = Some(report);
        job.finished_at = Some(Utc::now());
    }

    pub fn fail(&self, error: impl Into<String>) {
        let mut job = self.state.lock().expect("job state lock");
        job.status = JobStatus::Failed;
        job.message = "failed".into();
        job.error = Some(error.into());
        job.finished_at = Some(Utc::now());
    }
}

/// Registry of all jobs known to the process, keyed by id.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, Arc<JobHandle>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending job from a request and register it.
    pub fn create(&self, request: &JobRequest) -> Arc<JobHandle> {
        let selected = if request.selected_modules.is_empty() {
            ModuleKind::all().to_vec()
        } else {
            request.selected_modules.clone()
        };
        let job = Job {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            progress: 0,
            message: "pending".into(),
            selected_modules: selected,
            extraction_method: request.extraction_method,
            context: request.context.clone(),
            report: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        };
        let handle = Arc::new(JobHandle::new(job));
        let id = handle.snapshot().id;
        self.jobs
            .write()
            .expect("job registry lock")
            .insert(id, handle.clone());
        handle
    }

    /// Snapshot a job for polling.
    pub fn snapshot(&self, id: Uuid) -> Option<Job> {
        self.jobs
            .read()
            .expect("job registry lock")
            .get(&id)
            .map(|h| h.snapshot())
    }

    /// Request cancellation. The worker observes the flag at its next
    /// checkpoint; an already-terminal job is left untouched.
    pub fn cancel(&self, id: Uuid) -> bool {
        let jobs = self.jobs.read().expect("job registry lock");
        match jobs.get(&id) {
            Some(handle) if !handle.snapshot().status.is_terminal() => {
                handle.cancel_flag().store(true, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }

    /// Remove terminal jobs finished before `cutoff`; returns how many were
    /// dropped. Long-running deployments call this on a maintenance
    /// schedule; the registry otherwise grows with every job ever
    /// submitted. Live jobs are never touched.
    pub fn prune_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write().expect("job registry lock");
        let before = jobs.len();
        jobs.retain(|_, handle| {
            let job = handle.snapshot();
            match (job.status.is_terminal(), job.finished_at) {
                (true, Some(finished)) => finished >= cutoff,
                _ => true,
            }
        });
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().expect("job registry lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
