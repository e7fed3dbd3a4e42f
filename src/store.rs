//! Document store: resolves the active data file and opens it under either
//! search policy.
//!
//! - [`DocumentSnapshot`] is built once at startup (cached policy) and is
//!   immutable afterwards, so it can be shared across connection tasks
//!   behind an `Arc` without locking.
//! - [`DocumentStream`] is a fresh handle opened per request (re-read
//!   policy). It is owned by that request and closed when dropped, on both
//!   the success and the error path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::error::{LookupError, Result};
use crate::search::normalize;

/// Select the active data file from the ordered candidate list.
///
/// The rule is the same under both policies: the **last** declared path
/// wins. Returns `None` when no candidate was declared.
pub fn active_file_path(candidates: &[String]) -> Option<PathBuf> {
    candidates.last().map(PathBuf::from)
}

fn data_file_error(path: &Path, source: std::io::Error) -> LookupError {
    LookupError::DataFile {
        path: path.to_path_buf(),
        source,
    }
}

/// Immutable set of normalized lines captured from a data file.
#[derive(Debug, Default)]
pub struct DocumentSnapshot {
    path: PathBuf,
    lines: HashSet<String>,
}

impl DocumentSnapshot {
    /// Read `path` fully and index every normalized line.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| data_file_error(path, e))?;
        let snapshot = Self::from_text(path, &String::from_utf8_lossy(&bytes));
        if snapshot.is_empty() {
            warn!(path = %snapshot.path().display(), "document snapshot is empty");
        }
        info!(
            path = %snapshot.path().display(),
            distinct_lines = snapshot.len(),
            "document snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Build a snapshot from text already in memory.
    pub fn from_text(path: &Path, text: &str) -> Self {
        let lines = text
            .lines()
            .map(normalize)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            path: path.to_path_buf(),
            lines,
        }
    }

    /// Membership test on an already-normalized line.
    pub fn contains(&self, normalized: &str) -> bool {
        self.lines.contains(normalized)
    }

    /// Number of distinct non-empty lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Per-request line reader over the active data file.
pub struct DocumentStream {
    reader: BufReader<File>,
    buf: Vec<u8>,
}

impl DocumentStream {
    /// Open `path` for a single scan.
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .await
            .map_err(|e| data_file_error(path, e))?;
        Ok(Self {
            reader: BufReader::new(file),
            buf: Vec::new(),
        })
    }

    /// Next raw line, terminator included, or `None` at end of file.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, matching how
    /// [`DocumentSnapshot::load`] decodes the same file.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}
