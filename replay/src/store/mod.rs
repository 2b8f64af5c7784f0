//! Durable replay state: the checkpoint and the failure log.
//!
//! Both live side by side in one directory per [`ReplayMode`]
//! (see [`ReplayConfig::store_dir`]) and assume a single writer.
//!
//! [`ReplayMode`]: crate::config::ReplayMode
//! [`ReplayConfig::store_dir`]: crate::config::ReplayConfig::store_dir

use std::io;
use std::path::PathBuf;

use thiserror::Error;

mod error_log;
mod progress;

pub use error_log::{ErrorEntry, ErrorLog, ErrorReport};
pub use progress::{ProgressRecord, ProgressStore};

#[derive(Error, Debug)]
pub enum StoreError {
    /// The checkpoint exists but can't be trusted. Never repaired
    /// automatically: resuming from a guess could skip or repeat blocks.
    #[error("progress file {} is corrupted: {reason}", path.display())]
    CorruptState { path: PathBuf, reason: String },
    #[error("error log {} is corrupted at line {line}: {reason}", path.display())]
    CorruptLog {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}
