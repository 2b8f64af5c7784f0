//! Resumable replay of a chain's transactions through a node's debug tracing
//! RPC.
//!
//! The [`replayer::Replayer`] walks every block past the stored checkpoint,
//! re-executes each transaction with the tracing method selected by
//! [`config::ReplayMode`], records failures in the [`store::ErrorLog`] and
//! advances the [`store::ProgressStore`] once a block is fully accounted for.

pub mod config;
pub mod env;
pub mod error;
pub mod fs;
pub mod provider;
pub mod replayer;
pub mod rpc;
pub mod store;
pub mod tracing;

/// Common information for the `--version` CLI flags.
pub fn version() -> String {
    let pkg_name = env!("CARGO_PKG_NAME");
    let pkg_version = env!("CARGO_PKG_VERSION");
    let git_describe = env!("VERGEN_GIT_DESCRIBE");
    let timestamp = env!("VERGEN_BUILD_TIMESTAMP");
    format!("{pkg_name} {pkg_version} ({git_describe}) [built: {timestamp}]")
}
