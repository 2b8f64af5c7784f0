use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::StoreError;

const ERROR_LOG_FILE_NAME: &str = "errors.jsonl";

/// A transaction that could not be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub block_number: u64,
    #[serde(rename = "txn")]
    pub tx_hash: TxHash,
    #[serde(rename = "error")]
    pub message: String,
}

/// The whole log as a single document, `{"errors": [...]}`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorReport {
    pub errors: Vec<ErrorEntry>,
}

/// Append-only log of replay failures, one JSON object per line.
///
/// Entries are never rewritten or pruned, so an append costs one write no
/// matter how large the log has grown.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    file: File,
}

impl ErrorLog {
    /// Opens the log in `dir`, creating an empty one if none exists.
    ///
    /// A partial last line left by an interrupted append is cut off, so new
    /// entries always start on a line of their own.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(StoreError::io(dir))?;
        let path = Self::path_in(dir);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(StoreError::io(&path))?;
        Self::drop_torn_tail(&path, &file)?;
        Ok(Self { path, file })
    }

    fn drop_torn_tail(path: &Path, file: &File) -> Result<(), StoreError> {
        let contents = fs::read(path).map_err(StoreError::io(path))?;
        if contents.last().map_or(true, |&byte| byte == b'\n') {
            return Ok(());
        }

        let keep = contents
            .iter()
            .rposition(|&byte| byte == b'\n')
            .map_or(0, |newline| newline + 1);
        warn!(
            "Dropping {} bytes of a truncated last entry of {}",
            contents.len() - keep,
            path.display()
        );
        file.set_len(keep as u64)
            .and_then(|()| file.sync_data())
            .map_err(StoreError::io(path))
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(ERROR_LOG_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, entry: &ErrorEntry) -> Result<(), StoreError> {
        let mut line =
            serde_json::to_vec(entry).map_err(|e| StoreError::io(&self.path)(e.into()))?;
        line.push(b'\n');

        // One write per entry keeps a line intact unless the process dies
        // mid-write, which `read` tolerates for the last line.
        self.file
            .write_all(&line)
            .and_then(|()| self.file.sync_data())
            .map_err(StoreError::io(&self.path))
    }

    /// Reads every entry of the log at `path`. A missing log is empty.
    pub fn read(path: &Path) -> Result<Vec<ErrorEntry>, StoreError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(path)(e)),
        };

        let lines = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .collect::<Vec<_>>();
        let last = lines.len().saturating_sub(1);

        let mut entries = Vec::with_capacity(lines.len());
        for (position, (idx, line)) in lines.into_iter().enumerate() {
            match serde_json::from_str::<ErrorEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) if position == last && !contents.ends_with('\n') => {
                    warn!(
                        "Ignoring truncated last entry of {} (line {}): {e}",
                        path.display(),
                        idx + 1
                    );
                }
                Err(e) => {
                    return Err(StoreError::CorruptLog {
                        path: path.to_path_buf(),
                        line: idx + 1,
                        reason: e.to_string(),
                    })
                }
            }
        }
        Ok(entries)
    }
}
