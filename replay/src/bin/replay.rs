use std::path::Path;
use std::time::Duration;

use alloy::providers::Provider;
use alloy::transports::Transport;
use anyhow::{Context as _, Result};
use chain_replay::config::{store_dir, ReplayConfig, ReplayMode};
use chain_replay::env::load_dotenvy_vars_if_present;
use chain_replay::provider::NodeClient;
use chain_replay::replayer::Replayer;
use chain_replay::rpc::retry::{build_http_retry_provider, build_ws_retry_provider};
use chain_replay::store::{ErrorLog, ErrorReport, ProgressStore};
use clap::Parser;
use cli::Command;
use serde_json::json;
use tracing::{info, warn};

use self::replay::cli;
mod replay {
    pub mod cli;
}

/// How a `run` ends once the node is connected.
struct RunParams {
    config: ReplayConfig,
    follow: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenvy_vars_if_present();
    chain_replay::tracing::init();

    let args = cli::Cli::parse();
    let mode = args.mode.unwrap_or_else(|| {
        warn!("No mode selected, running with `--mode debug`");
        ReplayMode::Debug
    });

    match args.command {
        Command::Status => status(&args.data_dir, mode),
        Command::Errors => errors(&args.data_dir, mode),
        Command::Run {
            rpc_url,
            timeout,
            backoff,
            max_retries,
            follow,
            poll_interval,
        } => {
            let rpc_url = rpc_url.context("Please provide an `--rpc-url` argument")?;
            let params = RunParams {
                config: ReplayConfig::new(mode, args.data_dir)
                    .with_request_timeout(Duration::from_millis(timeout)),
                follow: follow.then(|| Duration::from_millis(poll_interval)),
            };

            info!("Replaying chain at {rpc_url} in {mode} mode");
            match rpc_url.scheme() {
                "ws" | "wss" => {
                    let provider = build_ws_retry_provider(rpc_url, backoff, max_retries)
                        .await
                        .context("Url cannot be accessed")?;
                    replay_chain(provider, params).await
                }
                _ => {
                    let provider = build_http_retry_provider(rpc_url, backoff, max_retries);
                    replay_chain(provider, params).await
                }
            }
        }
    }
}

async fn replay_chain<ProviderT, TransportT>(provider: ProviderT, params: RunParams) -> Result<()>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    let mut replayer = Replayer::new(NodeClient::new(provider), params.config)?;

    if let Some(poll_interval) = params.follow {
        info!("Following the chain head every {poll_interval:?}");
        replayer.follow(poll_interval).await?;
        return Ok(());
    }

    let summary = replayer.run().await?;
    if summary.is_caught_up() {
        info!(
            "Nothing to replay, already at block {}",
            summary.checkpoint.last_processed_block
        );
    } else {
        info!(
            "Replayed {} blocks ({} transactions, {} failed), checkpoint at block {}",
            summary.blocks,
            summary.transactions,
            summary.failures,
            summary.checkpoint.last_processed_block
        );
    }
    if summary.failures > 0 {
        warn!(
            "Failures were recorded in {}",
            replayer.error_log_path().display()
        );
    }
    Ok(())
}

fn status(data_dir: &Path, mode: ReplayMode) -> Result<()> {
    let dir = store_dir(data_dir, mode);
    let progress = ProgressStore::new(&dir).peek()?.unwrap_or_default();
    let failures = ErrorLog::read(&ErrorLog::path_in(&dir))?.len();

    serde_json::to_writer_pretty(
        std::io::stdout(),
        &json!({
            "mode": mode.as_str(),
            "lastProcessedBlock": progress.last_processed_block,
            "ethTransactionsProcessed": progress.transactions_processed,
            "errors": failures,
        }),
    )?;
    println!();
    Ok(())
}

fn errors(data_dir: &Path, mode: ReplayMode) -> Result<()> {
    let path = ErrorLog::path_in(&store_dir(data_dir, mode));
    let report = ErrorReport {
        errors: ErrorLog::read(&path)?,
    };
    serde_json::to_writer_pretty(std::io::stdout(), &report)?;
    println!();
    Ok(())
}
