use std::path::PathBuf;

use chain_replay::config::{ReplayMode, DEFAULT_DATA_DIR};
use clap::{Parser, Subcommand, ValueHint};
use url::Url;

/// Replays a chain's transactions through the node's debug tracing RPC and
/// keeps track of what failed.
#[derive(Parser)]
#[command(version = chain_replay::version(), propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,

    /// Replay mode. Each mode keeps its own progress and error log.
    #[arg(short, long, global = true, env = "REPLAY_MODE", value_enum)]
    pub(crate) mode: Option<ReplayMode>,

    /// Root directory for persisted state; `<DATA_DIR>/<MODE>` is used.
    #[arg(
        short,
        long,
        global = true,
        env = "REPLAY_DATA_DIR",
        default_value = DEFAULT_DATA_DIR,
        value_hint = ValueHint::DirPath
    )]
    pub(crate) data_dir: PathBuf,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Replays all blocks after the checkpoint up to the chain head.
    Run {
        /// The node RPC URL (http(s):// or ws(s)://).
        #[arg(short = 'u', long, env = "REPLAY_RPC_URL", value_hint = ValueHint::Url)]
        rpc_url: Option<Url>,
        /// Upper bound in milliseconds for a single RPC call. A timed out
        /// trace is recorded as a failed transaction.
        #[arg(short, long, env = "REPLAY_TIMEOUT", default_value_t = 30_000)]
        timeout: u64,
        /// Backoff in milliseconds for retry requests.
        #[arg(long, env = "REPLAY_BACKOFF", default_value_t = 0)]
        backoff: u64,
        /// The maximum number of retries of a request whose transport failed.
        #[arg(long, env = "REPLAY_MAX_RETRIES", default_value_t = 0)]
        max_retries: u32,
        /// Keep following the chain head instead of exiting once caught up.
        #[arg(short, long, env = "REPLAY_FOLLOW")]
        follow: bool,
        /// Milliseconds to wait for new blocks when following.
        #[arg(long, env = "REPLAY_POLL_INTERVAL", default_value_t = 2_000)]
        poll_interval: u64,
    },
    /// Prints the checkpoint and the number of recorded failures.
    Status,
    /// Prints every recorded failure as a single `{"errors": [...]}` JSON
    /// document.
    Errors,
}
