use std::cmp::Ordering;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::config::ReplayConfig;
use crate::error::ReplayError;
use crate::provider::ReplayNode;
use crate::rpc::TraceOutcome;
use crate::store::{ErrorEntry, ErrorLog, ProgressRecord, ProgressStore, StoreError};

/// What a single [`Replayer::run`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// The checkpoint once the run finished.
    pub checkpoint: ProgressRecord,
    pub blocks: u64,
    pub transactions: u64,
    pub failures: u64,
}

impl RunSummary {
    /// The run found no block past the checkpoint.
    pub fn is_caught_up(&self) -> bool {
        self.blocks == 0
    }
}

/// Replays a chain block by block, transaction by transaction.
///
/// Blocks are replayed strictly in order and the checkpoint is only moved
/// past a block once every one of its transactions was either replayed or
/// recorded in the error log. Stopping the process at any point therefore
/// resumes at the first block that wasn't fully accounted for.
pub struct Replayer<NodeT> {
    node: NodeT,
    method: &'static str,
    config: ReplayConfig,
    dir: PathBuf,
    progress: ProgressStore,
    /// Opened once the node is known to be reachable.
    errors: Option<ErrorLog>,
}

impl<NodeT> Replayer<NodeT>
where
    NodeT: ReplayNode,
{
    /// Nothing is written until [`Replayer::run`] has reached the node.
    /// Modes without a replay method are rejected here.
    pub fn new(node: NodeT, config: ReplayConfig) -> Result<Self, ReplayError> {
        let method = config
            .mode
            .rpc_method()
            .ok_or(ReplayError::UnsupportedMode(config.mode))?;
        let dir = config.store_dir();
        let progress = ProgressStore::new(&dir);

        Ok(Self {
            node,
            method,
            config,
            dir,
            progress,
            errors: None,
        })
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn progress_store(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn error_log_path(&self) -> PathBuf {
        ErrorLog::path_in(&self.dir)
    }

    fn error_log(&mut self) -> Result<&mut ErrorLog, StoreError> {
        let log = match self.errors.take() {
            Some(log) => log,
            None => ErrorLog::open(&self.dir)?,
        };
        Ok(self.errors.insert(log))
    }

    /// Replays every block after the checkpoint up to the current chain
    /// head.
    ///
    /// Being caught up (checkpoint equal to the head) is not an error; a
    /// checkpoint beyond the head is.
    pub async fn run(&mut self) -> Result<RunSummary, ReplayError> {
        self.check_node().await?;

        self.error_log()?;
        let mut progress = self.progress.load()?;
        let head = with_timeout(
            self.config.request_timeout,
            self.node.latest_block_number(),
        )
        .await
        .map_err(|error| ReplayError::Node {
            context: "couldn't fetch the chain head".to_string(),
            error,
        })?;

        let mut summary = RunSummary {
            checkpoint: progress,
            ..Default::default()
        };
        let from = progress.last_processed_block;
        match from.cmp(&head) {
            Ordering::Greater => {
                return Err(ReplayError::StaleProgress {
                    last_processed: from,
                    head,
                })
            }
            Ordering::Equal => {
                debug!("Caught up with chain head {head}");
                return Ok(summary);
            }
            Ordering::Less => {}
        }

        info!(
            "Replaying blocks {}..={head} in {} mode",
            from + 1,
            self.config.mode
        );
        for block_number in from + 1..=head {
            let (transactions, failures) = self.replay_block(block_number).await?;

            progress = progress.advance(block_number, transactions);
            self.progress.save(&progress)?;

            summary.checkpoint = progress;
            summary.blocks += 1;
            summary.transactions += transactions as u64;
            summary.failures += failures;
            info!("--- Processed block {block_number} ({transactions} transactions, {failures} failed)");
        }

        Ok(summary)
    }

    /// Keeps running, polling for new blocks every `poll_interval` once
    /// caught up. Only returns on a fatal error.
    pub async fn follow(&mut self, poll_interval: Duration) -> Result<(), ReplayError> {
        loop {
            let summary = self.run().await?;
            if !summary.is_caught_up() {
                info!(
                    "Replayed {} blocks, checkpoint at block {}",
                    summary.blocks, summary.checkpoint.last_processed_block
                );
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn check_node(&self) -> Result<(), ReplayError> {
        match with_timeout(self.config.request_timeout, self.node.is_listening()).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ReplayError::NodeUnavailable(
                "node reports it is not listening".to_string(),
            )),
            Err(e) => Err(ReplayError::NodeUnavailable(format!("{e:#}"))),
        }
    }

    /// Returns the number of transactions in the block and how many of them
    /// failed.
    async fn replay_block(&mut self, block_number: u64) -> Result<(usize, u64), ReplayError> {
        let tx_hashes = with_timeout(
            self.config.request_timeout,
            self.node.block_transaction_hashes(block_number),
        )
        .await
        .map_err(|error| ReplayError::Node {
            context: format!("couldn't fetch block {block_number}"),
            error,
        })?;

        let mut failures = 0;
        for &tx_hash in &tx_hashes {
            let outcome = with_timeout(
                self.config.request_timeout,
                self.node.trace_transaction(self.method, tx_hash),
            )
            .await;
            let message = match outcome {
                Ok(TraceOutcome::Success) => {
                    debug!("Processed transaction {tx_hash}");
                    continue;
                }
                Ok(TraceOutcome::Failed(message)) => message,
                // The request itself failed; recorded all the same.
                Err(e) => format!("{e:#}"),
            };

            warn!("Replay of transaction {tx_hash} in block {block_number} failed: {message}");
            self.error_log()?.append(&ErrorEntry {
                block_number,
                tx_hash,
                message,
            })?;
            failures += 1;
        }

        Ok((tx_hashes.len(), failures))
    }
}

async fn with_timeout<T>(
    duration: Duration,
    call: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    tokio::time::timeout(duration, call)
        .await
        .map_err(|_| anyhow!("request timed out after {duration:?}"))?
}
