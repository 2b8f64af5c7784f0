use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::StoreError;
use crate::fs::write_atomic;

const PROGRESS_FILE_NAME: &str = "progress.json";

/// The replay checkpoint.
///
/// On disk it always describes the last *fully* replayed block: it is only
/// rewritten once every transaction of that block has been accounted for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(rename = "lastProcessedBlock")]
    pub last_processed_block: u64,
    #[serde(rename = "ethTransactionsProcessed")]
    pub transactions_processed: u64,
}

impl ProgressRecord {
    /// The record after block `block_number`, holding `transaction_count`
    /// transactions, has been replayed.
    pub fn advance(self, block_number: u64, transaction_count: usize) -> Self {
        Self {
            last_processed_block: block_number,
            transactions_processed: self.transactions_processed + transaction_count as u64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(PROGRESS_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the checkpoint, creating a zeroed one on first use.
    pub fn load(&self) -> Result<ProgressRecord, StoreError> {
        if let Some(record) = self.peek()? {
            return Ok(record);
        }

        let record = ProgressRecord::default();
        self.save(&record)?;
        info!("Created progress file {}", self.path.display());
        Ok(record)
    }

    /// Loads the checkpoint without creating it.
    pub fn peek(&self) -> Result<Option<ProgressRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path)(e)),
        };

        let des = &mut serde_json::Deserializer::from_slice(&bytes);
        serde_path_to_error::deserialize(des)
            .map(Some)
            .map_err(|e| StoreError::CorruptState {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    /// Durably replaces the checkpoint. The record is only committed once
    /// this returns `Ok`.
    pub fn save(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record).map_err(|e| StoreError::io(&self.path)(e.into()))?;
        write_atomic(&self.path, &bytes).map_err(StoreError::io(&self.path))
    }
}
