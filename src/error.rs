//! Error types for journal storage and event processing

use crate::{CaseNumber, ConfigError};
use std::path::PathBuf;

/// Failure of a journal storage operation
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// Create, open, stat, read or write failed
    #[error("journal I/O error on {}: {source}", path.display())]
    Io {
        /// Journal file involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// Deleting the journal during rotation failed
    #[error("failed to purge journal {}: {source}", path.display())]
    Purge {
        /// Journal file involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// Entry could not be encoded as JSON
    #[error("failed to encode journal entry: {0}")]
    Encode(#[source] serde_json::Error),
    /// The journal path or ceiling could not be resolved
    #[error("cannot resolve journal location: {0}")]
    Resolve(#[from] ConfigError),
}

impl JournalError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this error came from a failed purge
    pub fn is_purge(&self) -> bool {
        matches!(self, Self::Purge { .. })
    }
}

/// Error surfaced by one event-processing cycle
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The journal could not be ensured or replayed; no record was attempted
    #[error("failed to prepare journal: {0}")]
    Prepare(#[source] JournalError),
    /// Writing a record failed; the rest of the batch was abandoned
    #[error("failed to record case {case_number}: {source}")]
    Record {
        /// Case whose append failed
        case_number: CaseNumber,
        /// Underlying journal failure
        #[source]
        source: JournalError,
    },
}

impl EventError {
    /// The journal failure behind this error
    pub fn journal_error(&self) -> &JournalError {
        match self {
            Self::Prepare(source) | Self::Record { source, .. } => source,
        }
    }

    /// Check if the cycle was aborted by a failed purge
    pub fn is_purge_failure(&self) -> bool {
        self.journal_error().is_purge()
    }
}
