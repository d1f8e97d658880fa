//! Append-only case journal storage.
//!
//! A journal is a JSONL file holding one [`JournalEntry`] per line. It is
//! bounded by a byte ceiling: when an append would push the file past the
//! ceiling, the whole file is purged and the line starts a new generation.
//! There is no trimming of older entries.
//!
//! Implementations provide the raw file primitives; the ceiling policy,
//! purge sequencing and generation tracking are shared default methods on
//! [`JournalStore`].

use crate::config::{PathResolver, EVENTS_FILE};
use crate::{CaseNumber, JournalEntry, JournalError};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Lifecycle state of the current journal generation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JournalState {
    /// File exists and holds no entries
    #[default]
    Empty,
    /// At least one entry has been written since the last purge
    Growing,
    /// Purged; nothing appended to the new generation yet
    Purged,
}

/// Generation bookkeeping shared by all stores
#[derive(Clone, Debug, Default)]
pub struct Generation {
    number: u64,
    state: JournalState,
}

impl Generation {
    /// Purges performed so far
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Current lifecycle state
    pub fn state(&self) -> JournalState {
        self.state
    }

    fn observe_size(&mut self, size: u64) {
        self.state = if size == 0 {
            JournalState::Empty
        } else {
            JournalState::Growing
        };
    }

    fn purged(&mut self) {
        self.number += 1;
        self.state = JournalState::Purged;
    }

    fn appended(&mut self) {
        self.state = JournalState::Growing;
    }
}

/// Result of [`JournalStore::ensure`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnsureOutcome {
    /// File did not exist and was created empty
    pub created: bool,
    /// File exceeded the ceiling and was purged
    pub purged: bool,
}

/// Result of [`JournalStore::append`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Bytes added to the file, newline included
    pub bytes_written: u64,
    /// The file was purged before the write
    pub purged: bool,
}

/// Case numbers recovered by replaying a journal
#[derive(Clone, Debug, Default)]
pub struct JournalScan {
    /// False when the journal file does not exist
    pub file_present: bool,
    /// Non-blank lines examined
    pub lines_read: usize,
    /// Case numbers in file order, duplicates included
    pub case_numbers: Vec<CaseNumber>,
    /// Lines that were not a JSON object
    pub malformed: usize,
    /// Objects without a usable `CaseNumber`
    pub without_case_number: usize,
}

impl JournalScan {
    fn absent() -> Self {
        Self::default()
    }

    /// Replay JSONL content.
    ///
    /// Lines are read as raw bytes so that a torn multi-byte character in a
    /// crash-truncated tail is treated like any other malformed line.
    pub fn from_reader(mut reader: impl BufRead) -> std::io::Result<Self> {
        let mut scan = Self {
            file_present: true,
            ..Self::default()
        };
        let mut line = Vec::new();

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }
            scan.lines_read += 1;

            let object = match serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(
                trimmed,
            ) {
                Ok(object) => object,
                Err(_) => {
                    scan.malformed += 1;
                    continue;
                }
            };

            match object
                .get("CaseNumber")
                .and_then(serde_json::Value::as_str)
                .and_then(CaseNumber::new)
            {
                Some(case_number) => scan.case_numbers.push(case_number),
                None => scan.without_case_number += 1,
            }
        }

        Ok(scan)
    }
}

/// Journal storage trait
pub trait JournalStore: Send {
    /// Location of the journal, used in logs and errors
    fn path(&self) -> &Path;

    /// Size ceiling in bytes
    fn max_bytes(&self) -> u64;

    /// Current size, or `None` when the journal does not exist
    fn size(&self) -> Result<Option<u64>, JournalError>;

    /// Create an empty journal if none exists; existing content is kept
    fn create(&mut self) -> Result<(), JournalError>;

    /// Delete the journal. A journal that is already gone is not an error.
    fn remove(&mut self) -> Result<(), JournalError>;

    /// Append raw bytes, creating the journal if needed
    fn write_line(&mut self, line: &str) -> Result<(), JournalError>;

    /// Final byte of the journal, or `None` when it is empty or absent
    fn last_byte(&self) -> Result<Option<u8>, JournalError>;

    /// Replay the journal's case numbers
    fn scan(&self) -> Result<JournalScan, JournalError>;

    /// Generation bookkeeping owned by the store
    fn generation_ref(&self) -> &Generation;

    /// Mutable generation bookkeeping; only the provided methods update it
    fn generation_mut(&mut self) -> &mut Generation;

    /// Lifecycle state of the current generation
    fn state(&self) -> JournalState {
        self.generation_ref().state()
    }

    /// Number of purges performed by this store
    fn generation(&self) -> u64 {
        self.generation_ref().number()
    }

    /// Make sure the journal exists and is within its ceiling.
    ///
    /// Creates an empty journal when none exists. An existing journal larger
    /// than the ceiling (left over from an earlier run) is purged.
    fn ensure(&mut self) -> Result<EnsureOutcome, JournalError> {
        match self.size()? {
            None => {
                self.create()?;
                self.generation_mut().observe_size(0);
                tracing::debug!(path = %self.path().display(), "created journal");
                Ok(EnsureOutcome {
                    created: true,
                    purged: false,
                })
            }
            Some(size) if size > self.max_bytes() => {
                tracing::error!(
                    path = %self.path().display(),
                    size,
                    max_bytes = self.max_bytes(),
                    "journal exceeds configured size"
                );
                self.purge()?;
                Ok(EnsureOutcome {
                    created: false,
                    purged: true,
                })
            }
            Some(size) => {
                self.generation_mut().observe_size(size);
                Ok(EnsureOutcome::default())
            }
        }
    }

    /// Append one entry, purging first if it would not fit.
    ///
    /// The ceiling check is `current + line > max_bytes`, so a write landing
    /// exactly on the ceiling is kept. A line longer than the ceiling is
    /// still written, alone, into a freshly purged journal.
    ///
    /// A journal whose last line was torn by a crash gets a terminating `\n`
    /// in front of the new line, counted against the ceiling, so the new entry
    /// starts on a line of its own.
    fn append(&mut self, entry: &JournalEntry) -> Result<AppendOutcome, JournalError> {
        let mut line = entry.to_line()?;
        let current = self.size()?.unwrap_or(0);
        let torn_tail = current > 0 && self.last_byte()? != Some(b'\n');
        let separator = u64::from(torn_tail);

        let purged =
            current.saturating_add(separator + line.len() as u64) > self.max_bytes();
        if purged {
            tracing::warn!(
                path = %self.path().display(),
                current,
                line_len = line.len(),
                max_bytes = self.max_bytes(),
                "journal would exceed configured size with next write, purging"
            );
            self.purge()?;
        } else if torn_tail {
            tracing::warn!(path = %self.path().display(), "terminating torn journal line");
            line.insert(0, '\n');
        }

        self.write_line(&line)?;
        self.generation_mut().appended();
        tracing::debug!(case_number = %entry.case_number, "wrote journal entry");

        Ok(AppendOutcome {
            bytes_written: line.len() as u64,
            purged,
        })
    }

    /// Delete the journal and recreate it empty.
    ///
    /// Leaves the store in [`JournalState::Purged`] until the next append or
    /// `ensure`.
    fn purge(&mut self) -> Result<(), JournalError> {
        tracing::info!(path = %self.path().display(), "purging journal");
        self.remove()?;
        self.ensure()?;
        self.generation_mut().purged();
        tracing::info!(
            path = %self.path().display(),
            generation = self.generation(),
            "purged journal"
        );
        Ok(())
    }
}

/// JSONL journal on the local filesystem
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    max_bytes: u64,
    generation: Generation,
}

impl FileJournal {
    /// Journal at `path`, purged whenever it would grow past `max_bytes`
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            path: path.into(),
            max_bytes,
            generation: Generation::default(),
        }
    }

    /// Build from the configured `events` file and ceiling
    pub fn from_resolver(resolver: &dyn PathResolver) -> Result<Self, JournalError> {
        let path = resolver.resolve(EVENTS_FILE)?;
        let max_bytes = resolver.max_bytes()?;
        Ok(Self::new(path, max_bytes))
    }

    fn io_error(&self, source: std::io::Error) -> JournalError {
        JournalError::io(&self.path, source)
    }

    fn open_append(&self) -> Result<File, JournalError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))
    }
}

impl JournalStore for FileJournal {
    fn path(&self) -> &Path {
        &self.path
    }

    fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn size(&self) -> Result<Option<u64>, JournalError> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn create(&mut self) -> Result<(), JournalError> {
        self.open_append().map(drop)
    }

    fn remove(&mut self) -> Result<(), JournalError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(JournalError::Purge {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), JournalError> {
        let mut file = self.open_append()?;
        file.write_all(line.as_bytes())
            .map_err(|e| self.io_error(e))
    }

    fn last_byte(&self) -> Result<Option<u8>, JournalError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let len = file.metadata().map_err(|e| self.io_error(e))?.len();
        if len == 0 {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))
            .and_then(|_| file.read_exact(&mut byte))
            .map_err(|e| self.io_error(e))?;
        Ok(Some(byte[0]))
    }

    fn scan(&self) -> Result<JournalScan, JournalError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(JournalScan::absent()),
            Err(e) => return Err(self.io_error(e)),
        };
        JournalScan::from_reader(BufReader::new(file)).map_err(|e| self.io_error(e))
    }

    fn generation_ref(&self) -> &Generation {
        &self.generation
    }

    fn generation_mut(&mut self) -> &mut Generation {
        &mut self.generation
    }
}

/// In-memory journal for testing and dry runs
#[derive(Debug)]
pub struct InMemoryJournal {
    label: PathBuf,
    max_bytes: u64,
    contents: Option<Vec<u8>>,
    generation: Generation,
}

impl InMemoryJournal {
    /// Empty in-memory journal; nothing exists until `ensure` or `append`
    pub fn new(max_bytes: u64) -> Self {
        Self {
            label: PathBuf::from("memory://events"),
            max_bytes,
            contents: None,
            generation: Generation::default(),
        }
    }

    /// Start from existing journal content, as if left by an earlier run
    pub fn with_contents(max_bytes: u64, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: Some(contents.into()),
            ..Self::new(max_bytes)
        }
    }

    /// Raw journal bytes; `None` when the journal does not exist
    pub fn contents(&self) -> Option<&[u8]> {
        self.contents.as_deref()
    }

    /// Non-empty lines currently held
    pub fn lines(&self) -> Vec<String> {
        self.contents
            .as_deref()
            .map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .lines()
                    .filter(|l| !l.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl JournalStore for InMemoryJournal {
    fn path(&self) -> &Path {
        &self.label
    }

    fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn size(&self) -> Result<Option<u64>, JournalError> {
        Ok(self.contents.as_ref().map(|c| c.len() as u64))
    }

    fn create(&mut self) -> Result<(), JournalError> {
        self.contents.get_or_insert_with(Vec::new);
        Ok(())
    }

    fn remove(&mut self) -> Result<(), JournalError> {
        self.contents = None;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), JournalError> {
        self.contents
            .get_or_insert_with(Vec::new)
            .extend_from_slice(line.as_bytes());
        Ok(())
    }

    fn last_byte(&self) -> Result<Option<u8>, JournalError> {
        Ok(self.contents.as_deref().and_then(|c| c.last().copied()))
    }

    fn scan(&self) -> Result<JournalScan, JournalError> {
        match self.contents.as_deref() {
            Some(bytes) => {
                JournalScan::from_reader(bytes).map_err(|e| JournalError::io(&self.label, e))
            }
            None => Ok(JournalScan::absent()),
        }
    }

    fn generation_ref(&self) -> &Generation {
        &self.generation
    }

    fn generation_mut(&mut self) -> &mut Generation {
        &mut self.generation
    }
}
