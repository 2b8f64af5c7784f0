use alloy::primitives::TxHash;
use alloy::transports::{RpcError, TransportResult};
use serde::Deserialize;
use serde_json::Value;

pub mod retry;

#[cfg(test)]
pub(crate) mod canned;

/// The part of an `eth_getBlockByNumber(n, false)` response replay needs.
#[derive(Debug, Deserialize)]
pub struct BlockTransactionHashes {
    pub transactions: Vec<TxHash>,
}

/// What the node made of a replayed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceOutcome {
    Success,
    /// The call went through, but the node reported an error for the
    /// transaction.
    Failed(String),
}

/// Splits a raw tracing response into the node's verdict and transport
/// failures.
///
/// A JSON-RPC error response and a result payload carrying an `error` field
/// are both the node's verdict on the transaction. Anything else that went
/// wrong with the call is returned as an error.
pub fn classify_trace_response(response: TransportResult<Value>) -> anyhow::Result<TraceOutcome> {
    match response {
        Ok(payload) => Ok(match payload.get("error") {
            Some(error) => TraceOutcome::Failed(error_message(error)),
            None => TraceOutcome::Success,
        }),
        Err(RpcError::ErrorResp(payload)) => Ok(TraceOutcome::Failed(payload.message.to_string())),
        Err(e) => Err(e.into()),
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(fields) => match fields.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => error.to_string(),
        },
        other => other.to_string(),
    }
}
