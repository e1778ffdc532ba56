//! Orchestrator — job lifecycle, module fan-out, and report consolidation.
//!
//! The surrounding application layer submits a [`JobRequest`] and polls the
//! [`JobRegistry`]; everything between extraction and the consolidated
//! report happens on a background worker thread, one per job.

pub mod job;
pub mod report;
pub mod runner;

pub use job::*;
pub use report::*;
pub use runner::*;
