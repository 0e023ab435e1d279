//! JSONL Recorder
//!
//! Append-only, one JSON document per line. Used for both the telemetry log
//! and the alert log. Writers are serialized behind a mutex and each record
//! goes out as a single unbuffered `write_all` of `line + '\n'`, so concurrent
//! appends never interleave. A failed append is rolled back to the previous
//! end of file, so a record reported as failed never shows up later.
//! There is no update or delete path.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Storage failure. Unlike scoring problems, these reach the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append to {path:?}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ============================================================================
// RECORDER
// ============================================================================

/// Append-only JSONL file
pub struct JsonlLog {
    path: PathBuf,
    writer: Mutex<File>,
    appended: AtomicU64,
}

impl JsonlLog {
    /// Open (creating parent directories and the file if needed)
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Open {
                path: path.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Open { path: path.clone(), source })?;

        log::info!("Opened append-only log: {:?}", path);

        Ok(Self {
            path,
            writer: Mutex::new(file),
            appended: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle since it was opened
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::SeqCst)
    }

    /// Append one record as a single line
    pub fn append<T: Serialize + ?Sized>(&self, record: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.write_line(&line)
    }

    /// Append an already-encoded JSON document. Line breaks (only legal as
    /// whitespace in JSON text) are replaced so the document stays on one line.
    pub fn append_raw(&self, document: &str) -> Result<(), StoreError> {
        let mut line: Vec<u8> = document
            .trim()
            .bytes()
            .map(|b| if b == b'\n' || b == b'\r' { b' ' } else { b })
            .collect();
        line.push(b'\n');
        self.write_line(&line)
    }

    fn write_line(&self, line: &[u8]) -> Result<(), StoreError> {
        let mut file = self.writer.lock();
        append_line(&mut *file, line).map_err(|source| StoreError::Append {
            path: self.path.clone(),
            source,
        })?;

        self.appended.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Last `limit` records, oldest first. Lines that do not parse as `T`
    /// are skipped.
    pub fn read_tail<T: DeserializeOwned>(&self, limit: usize) -> Result<Vec<T>, StoreError> {
        read_tail(&self.path, limit)
    }
}

// ============================================================================
// WRITE PATH
// ============================================================================

/// Destination of an append: reports its end offset and can be cut back
trait AppendTarget: Write {
    fn end_offset(&mut self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl AppendTarget for File {
    fn end_offset(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Write the whole line or nothing. On error any partial write is truncated
/// away before the error is returned.
fn append_line<W: AppendTarget + ?Sized>(target: &mut W, line: &[u8]) -> io::Result<()> {
    let start = target.end_offset()?;

    match target.write_all(line).and_then(|_| target.flush()) {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Err(rollback) = target.truncate_to(start) {
                log::error!("Failed to roll back partial append: {}", rollback);
            }
            Err(e)
        }
    }
}

// ============================================================================
// QUERY API
// ============================================================================

/// Last `limit` parseable records of a JSONL file, oldest first.
/// A missing file reads as empty.
pub fn read_tail<T: DeserializeOwned>(path: &Path, limit: usize) -> Result<Vec<T>, StoreError> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Read { path: path.to_path_buf(), source });
        }
    };

    let mut window: VecDeque<T> = VecDeque::with_capacity(limit.min(1024));
    let mut skipped = 0usize;

    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(&line) {
            Ok(record) => {
                if window.len() == limit {
                    window.pop_front();
                }
                window.push_back(record);
            }
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {} malformed line(s) in {:?}", skipped, path);
    }

    Ok(window.into_iter().collect())
}

// ============================================================================
// TESTS
// ============================================================================
