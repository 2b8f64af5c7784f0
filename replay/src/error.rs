use thiserror::Error;

use crate::config::ReplayMode;
use crate::store::StoreError;

/// Errors that abort a replay run.
///
/// Failures of individual transactions never surface here; they end up in
/// the [`ErrorLog`](crate::store::ErrorLog).
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("replay mode `{0}` is not implemented")]
    UnsupportedMode(ReplayMode),
    #[error("node cannot be reached: {0}")]
    NodeUnavailable(String),
    /// The checkpoint is beyond the chain head, e.g. the chain was reset or
    /// the state directory belongs to another chain.
    #[error(
        "outdated progress file: last processed block {last_processed} is ahead of chain head {head}"
    )]
    StaleProgress { last_processed: u64, head: u64 },
    #[error("{context}: {error:#}")]
    Node {
        context: String,
        error: anyhow::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
