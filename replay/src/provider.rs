use std::future::Future;

use alloy::primitives::TxHash;
use alloy::rpc::types::BlockNumberOrTag;
use alloy::{providers::Provider, transports::Transport};
use anyhow::Context as _;
use serde_json::Value;

use crate::rpc::{classify_trace_response, BlockTransactionHashes, TraceOutcome};

/// The node, as far as replay is concerned.
pub trait ReplayNode {
    /// Whether the node accepts connections (`net_listening`).
    fn is_listening(&self) -> impl Future<Output = anyhow::Result<bool>> + Send;

    fn latest_block_number(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;

    /// Hashes of the transactions in block `number`, in block order.
    fn block_transaction_hashes(
        &self,
        number: u64,
    ) -> impl Future<Output = anyhow::Result<Vec<TxHash>>> + Send;

    /// Replays one transaction with `method`.
    ///
    /// `Err` means the call itself failed; the node's verdict on the
    /// transaction is in the [`TraceOutcome`].
    fn trace_transaction(
        &self,
        method: &'static str,
        tx_hash: TxHash,
    ) -> impl Future<Output = anyhow::Result<TraceOutcome>> + Send;
}

/// [`ReplayNode`] on top of an alloy provider.
pub struct NodeClient<ProviderT, TransportT> {
    provider: ProviderT,
    _phantom: std::marker::PhantomData<TransportT>,
}

impl<ProviderT, TransportT> NodeClient<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    pub fn new(provider: ProviderT) -> Self {
        Self {
            provider,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<ProviderT, TransportT> ReplayNode for NodeClient<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    async fn is_listening(&self) -> anyhow::Result<bool> {
        Ok(self
            .provider
            .raw_request::<_, bool>("net_listening".into(), Vec::<Value>::new())
            .await?)
    }

    async fn latest_block_number(&self) -> anyhow::Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn block_transaction_hashes(&self, number: u64) -> anyhow::Result<Vec<TxHash>> {
        let block = self
            .provider
            .raw_request::<_, Option<BlockTransactionHashes>>(
                "eth_getBlockByNumber".into(),
                (BlockNumberOrTag::Number(number), false),
            )
            .await?
            .with_context(|| format!("target block {number} does not exist"))?;
        Ok(block.transactions)
    }

    async fn trace_transaction(
        &self,
        method: &'static str,
        tx_hash: TxHash,
    ) -> anyhow::Result<TraceOutcome> {
        let response = self
            .provider
            .raw_request::<_, Value>(method.into(), vec![tx_hash])
            .await;
        classify_trace_response(response)
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt as _;
    use serde_json::json;

    use super::*;
    use crate::rpc::canned::{Canned, Reply};

    fn hash(byte: u8) -> TxHash {
        TxHash::repeat_byte(byte)
    }

    #[test]
    fn fetches_transaction_hashes_by_number() {
        let canned = Canned::new().respond(
            "eth_getBlockByNumber",
            json!({"number": "0xa", "transactions": [hash(1), hash(2)]}),
        );
        let node = NodeClient::new(canned.clone().into_provider());

        let hashes = node
            .block_transaction_hashes(10)
            .now_or_never()
            .unwrap()
            .unwrap();

        assert_eq!(hashes, vec![hash(1), hash(2)]);
        assert_eq!(
            canned.calls(),
            vec![("eth_getBlockByNumber".to_string(), json!(["0xa", false]))]
        );
    }

    #[test]
    fn missing_block_is_an_error() {
        let node = NodeClient::new(
            Canned::new()
                .respond("eth_getBlockByNumber", Value::Null)
                .into_provider(),
        );
        let err = node
            .block_transaction_hashes(7)
            .now_or_never()
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains("block 7 does not exist"), "{err}");
    }

    #[test]
    fn traces_with_the_hash_as_sole_param() {
        let canned = Canned::new().respond_with("debug_traceTransaction", |params| {
            if params[0] == json!(hash(2)) {
                Reply::Error("execution reverted".to_string())
            } else {
                Reply::result(json!({"gas": 21000, "structLogs": []}))
            }
        });
        let node = NodeClient::new(canned.clone().into_provider());

        let ok = node
            .trace_transaction("debug_traceTransaction", hash(1))
            .now_or_never()
            .unwrap()
            .unwrap();
        let reverted = node
            .trace_transaction("debug_traceTransaction", hash(2))
            .now_or_never()
            .unwrap()
            .unwrap();

        assert_eq!(ok, TraceOutcome::Success);
        assert_eq!(
            reverted,
            TraceOutcome::Failed("execution reverted".to_string())
        );
        assert_eq!(canned.calls()[0].1, json!([hash(1)]));
    }

    #[test]
    fn dropped_connection_is_a_transport_error() {
        let node = NodeClient::new(
            Canned::new()
                .respond_with("debug_traceTransaction", |_| Reply::Drop)
                .into_provider(),
        );
        assert!(node
            .trace_transaction("debug_traceTransaction", hash(1))
            .now_or_never()
            .unwrap()
            .is_err());
    }

    #[test]
    fn listening() {
        let node = NodeClient::new(Canned::new().respond("net_listening", true).into_provider());
        assert!(node.is_listening().now_or_never().unwrap().unwrap());
    }
}
