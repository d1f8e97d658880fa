//! Case-Event Journal
//!
//! An append-only, size-bounded JSONL journal of support cases seen while
//! polling a case-tracking API. Each polling cycle hands its batch to an
//! [`EventProcessor`], which writes every case at most once per run.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use case_journal::{CaseRecord, Config, EventProcessor, FileJournal};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file(Path::new("config.json"))?;
//! let journal = FileJournal::from_resolver(&config)?;
//! let mut processor = EventProcessor::new(journal, config.processor_options());
//!
//! // once per polling cycle
//! let batch: Vec<CaseRecord> = Vec::new();
//! let report = processor.process(&batch)?;
//! println!("journaled {} new cases", report.written);
//! # Ok(())
//! # }
//! ```
//!
//! The journal file is purged outright when the next line would push it past
//! its configured size. [`PurgePolicy`] decides whether the ledger forgets
//! its cases when that happens.

#![warn(missing_docs)]

// === Core Types ===
mod case;
mod entry;
mod error;

// === Storage ===
pub mod journal;
mod ledger;

// === Processing ===
mod poller;
mod processor;

// === Configuration ===
mod config;

// === Observability ===
#[cfg(feature = "logging")]
pub mod logging;
mod observer;
mod stats;

// === Re-exports ===

// Types
pub use case::{CaseNumber, CaseRecord, EmptyCaseNumber, NamedRef};
pub use entry::JournalEntry;

// Errors
pub use config::ConfigError;
pub use error::{EventError, JournalError};

// Storage
pub use journal::{
    AppendOutcome, EnsureOutcome, FileJournal, InMemoryJournal, JournalScan, JournalState,
    JournalStore,
};
pub use ledger::{Ledger, RebuildReport};

// Processing
pub use poller::{CaseSink, CaseSource, CycleOutcome, MockDataSource, Poller, QueryResponse, SourceError};
pub use processor::{CycleReport, EventProcessor, ProcessorOptions, PurgePolicy, RebuildMode};

// Configuration
pub use config::{Config, FileRegistry, PathResolver, Settings, EVENTS_FILE, LOG_FILE};

// Observability
pub use observer::{JournalObserver, NoOpObserver, TracingObserver};
pub use stats::{JournalStats, JournalStatsSnapshot};
