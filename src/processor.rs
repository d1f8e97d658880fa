//! Per-cycle event processing: batch of cases in, journal lines out

use crate::{
    CaseRecord, EventError, JournalEntry, JournalObserver, JournalStats, JournalStore, Ledger,
    NoOpObserver,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// What an in-run purge does to the ledger.
///
/// A purge empties the journal file. Whether cases seen before the purge may
/// be written again during the same run is a policy decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgePolicy {
    /// Ledger survives purges: every case is journaled at most once per run,
    /// even if its line was purged
    #[default]
    KeepLedger,
    /// Ledger is cleared on every purge so it always mirrors the file
    ResetLedger,
}

/// When the ledger is replayed from the journal
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildMode {
    /// Once, on the first cycle; afterwards the ledger is maintained in memory
    #[default]
    Startup,
    /// Before every cycle (picks up lines written by other tools)
    EveryCycle,
}

/// Tunables for an [`EventProcessor`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// Ledger behaviour on purge
    pub purge_policy: PurgePolicy,
    /// Ledger replay frequency
    pub rebuild: RebuildMode,
}

/// Summary of one processed batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records in the batch
    pub received: usize,
    /// New lines appended
    pub written: usize,
    /// Records skipped because their case was already journaled
    pub duplicates: usize,
    /// Records skipped for lack of a case number
    pub missing_case_number: usize,
    /// Purges during the cycle, including one from `ensure`
    pub purges: usize,
}

/// Turns polled case batches into journal entries, at most once per case.
///
/// Owns the journal and the ledger; construct one per process and call
/// [`EventProcessor::process`] once per polling cycle.
pub struct EventProcessor<J: JournalStore> {
    journal: J,
    ledger: Ledger,
    options: ProcessorOptions,
    primed: bool,
    stats: Arc<JournalStats>,
    observer: Arc<dyn JournalObserver>,
}

impl<J: JournalStore> EventProcessor<J> {
    /// Processor over `journal` with an empty, unprimed ledger
    pub fn new(journal: J, options: ProcessorOptions) -> Self {
        Self {
            journal,
            ledger: Ledger::new(),
            options,
            primed: false,
            stats: Arc::new(JournalStats::new()),
            observer: Arc::new(NoOpObserver),
        }
    }

    /// Replace the default no-op observer
    pub fn with_observer(mut self, observer: Arc<dyn JournalObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Share a stats instance with other components
    pub fn with_stats(mut self, stats: Arc<JournalStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Underlying journal store
    pub fn journal(&self) -> &J {
        &self.journal
    }

    /// Cases seen this run
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Shared counters
    pub fn stats(&self) -> &Arc<JournalStats> {
        &self.stats
    }

    /// Options the processor was built with
    pub fn options(&self) -> ProcessorOptions {
        self.options
    }

    /// Journal one polling cycle's batch.
    ///
    /// Records are handled in order. The first storage failure abandons the
    /// rest of the batch; lines already appended are kept.
    pub fn process(&mut self, records: &[CaseRecord]) -> Result<CycleReport, EventError> {
        JournalStats::bump(&self.stats.cycles);
        self.stats
            .records_received
            .fetch_add(records.len() as u64, Ordering::Relaxed);

        let result = self.run_cycle(records);
        match &result {
            Ok(report) => self.observer.on_cycle_completed(report),
            Err(error) => {
                JournalStats::bump(&self.stats.cycle_failures);
                self.observer.on_cycle_failed(error);
            }
        }
        result
    }

    fn run_cycle(&mut self, records: &[CaseRecord]) -> Result<CycleReport, EventError> {
        let mut report = CycleReport {
            received: records.len(),
            ..CycleReport::default()
        };

        if self.journal.ensure().map_err(EventError::Prepare)?.purged {
            self.after_purge(&mut report);
        }

        if !self.primed || self.options.rebuild == RebuildMode::EveryCycle {
            self.ledger
                .rebuild(&self.journal)
                .map_err(EventError::Prepare)?;
            self.primed = true;
        }

        for record in records {
            let Some(entry) = JournalEntry::from_record(record) else {
                report.missing_case_number += 1;
                JournalStats::bump(&self.stats.records_without_case_number);
                tracing::warn!("skipping case record without a case number");
                continue;
            };

            if self.ledger.contains(entry.case_number.as_str()) {
                report.duplicates += 1;
                JournalStats::bump(&self.stats.duplicates_skipped);
                self.observer.on_duplicate_skipped(&entry.case_number);
                continue;
            }

            let outcome = match self.journal.append(&entry) {
                Ok(outcome) => outcome,
                Err(source) => {
                    return Err(EventError::Record {
                        case_number: entry.case_number,
                        source,
                    })
                }
            };
            if outcome.purged {
                self.after_purge(&mut report);
            }

            self.observer
                .on_entry_written(&entry.case_number, outcome.bytes_written);
            self.ledger.remember(entry.case_number);
            report.written += 1;
            JournalStats::bump(&self.stats.entries_written);
        }

        Ok(report)
    }

    fn after_purge(&mut self, report: &mut CycleReport) {
        report.purges += 1;
        JournalStats::bump(&self.stats.purges);
        self.observer
            .on_purged(self.journal.path(), self.journal.generation());

        if self.options.purge_policy == PurgePolicy::ResetLedger {
            tracing::info!(forgotten = self.ledger.len(), "purge reset the ledger");
            self.ledger.clear();
        }
    }
}
