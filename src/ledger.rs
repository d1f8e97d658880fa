//! Per-run deduplication ledger

use crate::{CaseNumber, JournalError, JournalStore};
use std::collections::HashSet;

/// Outcome of replaying a journal into the ledger
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// False when there was no journal to replay (first run)
    pub file_present: bool,
    /// Non-empty lines examined
    pub lines_read: usize,
    /// Case numbers that were not already in the ledger
    pub inserted: usize,
    /// Lines that were not a JSON object
    pub malformed: usize,
    /// Objects with no usable `CaseNumber`
    pub without_case_number: usize,
}

/// Case numbers already journaled during this run.
///
/// Seeded once from the journal on disk, then kept current by
/// [`Ledger::remember`] after each successful append. Only grows, except for
/// an explicit [`Ledger::clear`].
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    seen: HashSet<CaseNumber>,
}

impl Ledger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every case number found in the journal. Never removes entries.
    pub fn rebuild(&mut self, journal: &dyn JournalStore) -> Result<RebuildReport, JournalError> {
        let scan = journal.scan()?;

        if !scan.file_present {
            tracing::debug!(path = %journal.path().display(), "no journal to replay");
            return Ok(RebuildReport::default());
        }

        let mut report = RebuildReport {
            file_present: true,
            lines_read: scan.lines_read,
            malformed: scan.malformed,
            without_case_number: scan.without_case_number,
            inserted: 0,
        };
        for case_number in scan.case_numbers {
            if self.seen.insert(case_number) {
                report.inserted += 1;
            }
        }

        if report.malformed > 0 {
            tracing::warn!(
                path = %journal.path().display(),
                malformed = report.malformed,
                "skipped malformed journal lines"
            );
        }
        tracing::info!(
            path = %journal.path().display(),
            lines = report.lines_read,
            inserted = report.inserted,
            total = self.seen.len(),
            "replayed journal into ledger"
        );

        Ok(report)
    }

    /// Whether the case was journaled this run
    pub fn contains(&self, case_number: &str) -> bool {
        self.seen.contains(case_number)
    }

    /// Record a case number. Returns false if it was already present.
    pub fn remember(&mut self, case_number: CaseNumber) -> bool {
        self.seen.insert(case_number)
    }

    /// Forget everything; used only when purges reset the ledger
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    /// Number of distinct cases remembered
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True before anything was remembered or replayed
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
