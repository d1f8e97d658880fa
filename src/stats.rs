//! Journal processing statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated across polling cycles
pub struct JournalStats {
    /// Calls to `EventProcessor::process`
    pub cycles: AtomicU64,
    /// Records handed in, valid or not
    pub records_received: AtomicU64,
    /// Lines appended to the journal
    pub entries_written: AtomicU64,
    /// Records skipped because the ledger already had them
    pub duplicates_skipped: AtomicU64,
    /// Records skipped for lack of a case number
    pub records_without_case_number: AtomicU64,
    /// Journal purges, from `ensure` or `append`
    pub purges: AtomicU64,
    /// Cycles that returned an error
    pub cycle_failures: AtomicU64,
}

impl JournalStats {
    /// All counters at zero
    pub fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            records_received: AtomicU64::new(0),
            entries_written: AtomicU64::new(0),
            duplicates_skipped: AtomicU64::new(0),
            records_without_case_number: AtomicU64::new(0),
            purges: AtomicU64::new(0),
            cycle_failures: AtomicU64::new(0),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> JournalStatsSnapshot {
        JournalStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            records_received: self.records_received.load(Ordering::Relaxed),
            entries_written: self.entries_written.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            records_without_case_number: self.records_without_case_number.load(Ordering::Relaxed),
            purges: self.purges.load(Ordering::Relaxed),
            cycle_failures: self.cycle_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for JournalStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain values read from [`JournalStats`]; fields mirror its counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JournalStatsSnapshot {
    /// See [`JournalStats::cycles`]
    pub cycles: u64,
    /// See [`JournalStats::records_received`]
    pub records_received: u64,
    /// See [`JournalStats::entries_written`]
    pub entries_written: u64,
    /// See [`JournalStats::duplicates_skipped`]
    pub duplicates_skipped: u64,
    /// See [`JournalStats::records_without_case_number`]
    pub records_without_case_number: u64,
    /// See [`JournalStats::purges`]
    pub purges: u64,
    /// See [`JournalStats::cycle_failures`]
    pub cycle_failures: u64,
}
