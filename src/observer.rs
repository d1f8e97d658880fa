//! Journal observer trait

use crate::{CaseNumber, CycleReport, EventError};
use std::path::Path;

/// Observer trait for external observability
pub trait JournalObserver: Send + Sync + 'static {
    /// A line of `bytes` bytes was appended for `case_number`
    fn on_entry_written(&self, case_number: &CaseNumber, bytes: u64);
    /// `case_number` was already in the ledger
    fn on_duplicate_skipped(&self, case_number: &CaseNumber);
    /// The journal at `path` was purged; `generation` is the new count
    fn on_purged(&self, path: &Path, generation: u64);
    /// A cycle finished without error
    fn on_cycle_completed(&self, report: &CycleReport);
    /// A cycle was aborted
    fn on_cycle_failed(&self, error: &EventError);
}

/// No-op observer
pub struct NoOpObserver;

impl JournalObserver for NoOpObserver {
    fn on_entry_written(&self, _case_number: &CaseNumber, _bytes: u64) {}
    fn on_duplicate_skipped(&self, _case_number: &CaseNumber) {}
    fn on_purged(&self, _path: &Path, _generation: u64) {}
    fn on_cycle_completed(&self, _report: &CycleReport) {}
    fn on_cycle_failed(&self, _error: &EventError) {}
}

/// Tracing-based observer
pub struct TracingObserver;

impl JournalObserver for TracingObserver {
    fn on_entry_written(&self, case_number: &CaseNumber, bytes: u64) {
        tracing::debug!(case_number = %case_number, bytes, "Journal entry written");
    }

    fn on_duplicate_skipped(&self, case_number: &CaseNumber) {
        tracing::trace!(case_number = %case_number, "Case already journaled");
    }

    fn on_purged(&self, path: &Path, generation: u64) {
        tracing::info!(path = %path.display(), generation, "Journal rotated");
    }

    fn on_cycle_completed(&self, report: &CycleReport) {
        tracing::info!(
            received = report.received,
            written = report.written,
            duplicates = report.duplicates,
            purges = report.purges,
            "Journal cycle completed"
        );
    }

    fn on_cycle_failed(&self, error: &EventError) {
        tracing::error!(error = %error, purge_failure = error.is_purge_failure(), "Journal cycle failed");
    }
}
