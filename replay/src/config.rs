use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;

/// Default root directory for persisted replay state.
pub const DEFAULT_DATA_DIR: &str = "db";

/// Default bound on a single RPC call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How transactions are replayed.
///
/// The mode selects both the RPC method and the state subdirectory, so
/// progress recorded in one mode never leaks into the other.
#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum ReplayMode {
    /// Re-executes each transaction with `debug_traceTransaction`.
    Debug,
    /// Reserved for `trace_*` based replay. Not implemented.
    Trace,
}

impl ReplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplayMode::Debug => "debug",
            ReplayMode::Trace => "trace",
        }
    }

    /// The RPC method used to replay a single transaction, if the mode has
    /// one.
    pub fn rpc_method(&self) -> Option<&'static str> {
        match self {
            ReplayMode::Debug => Some("debug_traceTransaction"),
            ReplayMode::Trace => None,
        }
    }
}

impl fmt::Display for ReplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a [`Replayer`](crate::replayer::Replayer) needs to know about
/// where it keeps its state and how patient it is with the node.
#[derive(Clone, Debug)]
pub struct ReplayConfig {
    pub mode: ReplayMode,
    pub data_dir: PathBuf,
    pub request_timeout: Duration,
}

impl ReplayConfig {
    pub fn new(mode: ReplayMode, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            data_dir: data_dir.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Directory holding the progress file and error log for this mode.
    pub fn store_dir(&self) -> PathBuf {
        store_dir(&self.data_dir, self.mode)
    }
}

pub fn store_dir(data_dir: &Path, mode: ReplayMode) -> PathBuf {
    data_dir.join(mode.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_never_share_a_store_dir() {
        let debug = ReplayConfig::new(ReplayMode::Debug, "db");
        let trace = ReplayConfig::new(ReplayMode::Trace, "db");
        assert_eq!(debug.store_dir(), PathBuf::from("db/debug"));
        assert_eq!(trace.store_dir(), PathBuf::from("db/trace"));
    }

    #[test]
    fn only_debug_mode_has_a_method() {
        assert_eq!(
            ReplayMode::Debug.rpc_method(),
            Some("debug_traceTransaction")
        );
        assert_eq!(ReplayMode::Trace.rpc_method(), None);
    }
}
