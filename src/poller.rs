//! Polling driver: fetch, hand off to sinks, journal.
//!
//! The journal is a side channel. Sinks (renderer, notifier) see every
//! fetched batch whether or not journaling it succeeds, and a failed cycle
//! never stops the loop.

use crate::{CaseRecord, CycleReport, EventProcessor, JournalStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Failure to obtain a batch of cases
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Saved response could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Response file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// Response body is not a query result
    #[error("malformed case response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Upstream call failed
    #[error("fetch failed: {0}")]
    Fetch(Box<str>),
}

/// Upstream case query client
pub trait CaseSource: Send {
    /// Fetch the current batch of cases
    fn fetch(&mut self) -> Result<Vec<CaseRecord>, SourceError>;
}

/// Consumer of each fetched batch (terminal renderer, notifier)
pub trait CaseSink: Send {
    /// Handle one fetched batch
    fn consume(&mut self, records: &[CaseRecord]);
}

impl<F> CaseSink for F
where
    F: FnMut(&[CaseRecord]) + Send,
{
    fn consume(&mut self, records: &[CaseRecord]) {
        self(records)
    }
}

/// Body of a case query response: `{"records": [...]}`
#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    /// Cases returned by the query
    #[serde(default)]
    pub records: Vec<CaseRecord>,
}

impl QueryResponse {
    /// Decode a response body
    pub fn from_json(body: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Replays a saved query response from disk instead of calling the API
pub struct MockDataSource {
    path: PathBuf,
}

impl MockDataSource {
    /// Source reading the response saved at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File the source reads
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaseSource for MockDataSource {
    fn fetch(&mut self) -> Result<Vec<CaseRecord>, SourceError> {
        let body = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(QueryResponse::from_json(&body)?.records)
    }
}

/// Result of one polling cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Sinks ran and the batch was journaled
    Journaled(CycleReport),
    /// Nothing fetched; sinks and journal were skipped
    FetchFailed,
    /// Sinks ran; journaling the batch failed
    JournalFailed,
}

/// Runs one journal cycle per fetch on a fixed interval
pub struct Poller<S: CaseSource, J: JournalStore> {
    source: S,
    sinks: Vec<Box<dyn CaseSink>>,
    processor: EventProcessor<J>,
    interval: Duration,
}

impl<S: CaseSource, J: JournalStore> Poller<S, J> {
    /// Poller with no sinks
    pub fn new(source: S, processor: EventProcessor<J>, interval: Duration) -> Self {
        Self {
            source,
            sinks: Vec::new(),
            processor,
            interval,
        }
    }

    /// Add a sink; sinks run in insertion order
    pub fn with_sink(mut self, sink: impl CaseSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Processor journaling the batches
    pub fn processor(&self) -> &EventProcessor<J> {
        &self.processor
    }

    /// Consume the poller, keeping its processor
    pub fn into_processor(self) -> EventProcessor<J> {
        self.processor
    }

    /// Fetch once, feed the sinks, then journal the batch
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let records = match self.source.fetch() {
            Ok(records) => records,
            Err(error) => {
                tracing::error!(error = %error, "failed to fetch cases");
                return CycleOutcome::FetchFailed;
            }
        };
        tracing::debug!(count = records.len(), "fetched cases");

        for sink in &mut self.sinks {
            sink.consume(&records);
        }

        match self.processor.process(&records) {
            Ok(report) => CycleOutcome::Journaled(report),
            Err(error) => {
                tracing::error!(error = %error, "failed to journal cases");
                CycleOutcome::JournalFailed
            }
        }
    }

    /// Poll until `shutdown` turns true or its sender is dropped.
    ///
    /// The first cycle runs immediately. A cycle in progress always runs to
    /// completion before shutdown is observed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Self {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "poller started");

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.run_cycle();
                }
            }
        }

        tracing::info!("poller stopped");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryJournal, JournalError, JournalStats, ProcessorOptions};
    use crate::journal::{Generation, JournalScan};
    use std::sync::{Arc, Mutex};

    struct ScriptedSource {
        batches: Vec<Result<Vec<CaseRecord>, SourceError>>,
        calls: Arc<Mutex<usize>>,
    }

    impl CaseSource for ScriptedSource {
        fn fetch(&mut self) -> Result<Vec<CaseRecord>, SourceError> {
            *self.calls.lock().unwrap() += 1;
            if self.batches.is_empty() {
                Ok(Vec::new())
            } else {
                self.batches.remove(0)
            }
        }
    }

    fn scripted(batches: Vec<Result<Vec<CaseRecord>, SourceError>>) -> (ScriptedSource, Arc<Mutex<usize>>) {
        let calls = Arc::new(Mutex::new(0));
        (
            ScriptedSource {
                batches,
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn batch(numbers: &[&str]) -> Vec<CaseRecord> {
        numbers.iter().map(|n| CaseRecord::with_case_number(*n)).collect()
    }

    /// Journal whose file can never be created
    struct BrokenJournal {
        generation: Generation,
    }

    impl JournalStore for BrokenJournal {
        fn path(&self) -> &Path {
            Path::new("/nonexistent/events.jsonl")
        }
        fn max_bytes(&self) -> u64 {
            1024
        }
        fn size(&self) -> Result<Option<u64>, JournalError> {
            Ok(None)
        }
        fn create(&mut self) -> Result<(), JournalError> {
            Err(JournalError::Io {
                path: self.path().to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        }
        fn remove(&mut self) -> Result<(), JournalError> {
            Ok(())
        }
        fn write_line(&mut self, _line: &str) -> Result<(), JournalError> {
            self.create()
        }
        fn last_byte(&self) -> Result<Option<u8>, JournalError> {
            Ok(None)
        }
        fn scan(&self) -> Result<JournalScan, JournalError> {
            Ok(JournalScan::default())
        }
        fn generation_ref(&self) -> &Generation {
            &self.generation
        }
        fn generation_mut(&mut self) -> &mut Generation {
            &mut self.generation
        }
    }

    #[test]
    fn test_cycle_feeds_sinks_and_journal() {
        let (source, _) = scripted(vec![Ok(batch(&["1", "2"]))]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let processor = EventProcessor::new(InMemoryJournal::new(4096), ProcessorOptions::default());
        let mut poller = Poller::new(source, processor, Duration::from_secs(60))
            .with_sink(move |records: &[CaseRecord]| sink_seen.lock().unwrap().push(records.len()));

        let outcome = poller.run_cycle();

        match outcome {
            CycleOutcome::Journaled(report) => assert_eq!(report.written, 2),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_journal_failure_does_not_starve_sinks() {
        let (source, _) = scripted(vec![Ok(batch(&["1"]))]);
        let seen = Arc::new(Mutex::new(0));
        let sink_seen = seen.clone();
        let processor = EventProcessor::new(
            BrokenJournal {
                generation: Generation::default(),
            },
            ProcessorOptions::default(),
        );
        let mut poller = Poller::new(source, processor, Duration::from_secs(60))
            .with_sink(move |_: &[CaseRecord]| *sink_seen.lock().unwrap() += 1);

        assert_eq!(poller.run_cycle(), CycleOutcome::JournalFailed);
        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(poller.processor().stats().snapshot().cycle_failures, 1);
    }

    #[test]
    fn test_fetch_failure_skips_journal() {
        let (source, _) = scripted(vec![Err(SourceError::Fetch("HTTP 503".into()))]);
        let processor = EventProcessor::new(InMemoryJournal::new(4096), ProcessorOptions::default());
        let mut poller = Poller::new(source, processor, Duration::from_secs(60));

        assert_eq!(poller.run_cycle(), CycleOutcome::FetchFailed);
        assert!(poller.processor().journal().contents().is_none());
    }

    #[test]
    fn test_mock_data_source_reads_query_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mockData.json");
        std::fs::write(
            &path,
            r#"{"totalSize": 2, "records": [{"CaseNumber": "1"}, {"CaseNumber": "2", "Owner": {"Name": "Ann"}}]}"#,
        )
        .unwrap();

        let records = MockDataSource::new(&path).fetch().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].owner_name(), Some("Ann"));
    }

    #[test]
    fn test_mock_data_source_missing_file() {
        let err = MockDataSource::new("/nonexistent/mockData.json")
            .fetch()
            .unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_on_interval_until_shutdown() {
        let (source, calls) = scripted(vec![Ok(batch(&["1"])), Ok(batch(&["1", "2"]))]);
        let stats = Arc::new(JournalStats::new());
        let processor = EventProcessor::new(InMemoryJournal::new(4096), ProcessorOptions::default())
            .with_stats(stats.clone());
        let poller = Poller::new(source, processor, Duration::from_secs(300));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(poller.run(rx));
        tokio::time::sleep(Duration::from_secs(301)).await;
        tx.send(true).unwrap();
        let poller = handle.await.unwrap();

        assert_eq!(*calls.lock().unwrap(), 2);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.cycles, 2);
        assert_eq!(snapshot.entries_written, 2);
        assert_eq!(poller.into_processor().journal().lines().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exits_when_sender_dropped() {
        let (source, calls) = scripted(Vec::new());
        let processor = EventProcessor::new(InMemoryJournal::new(4096), ProcessorOptions::default());
        let poller = Poller::new(source, processor, Duration::from_secs(60));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(poller.run(rx));
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(tx);
        handle.await.unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
