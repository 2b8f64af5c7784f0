//! Transport-level retries.
//!
//! The layer re-sends a request whose transport failed (connection refused,
//! reset, ...) after a fixed backoff. A JSON-RPC error response is an answer,
//! not a transport failure, and is never retried. With `max_retries == 0`, the
//! default, every request goes out exactly once.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use alloy::{
    providers::{ProviderBuilder, RootProvider},
    pubsub::PubSubFrontend,
    rpc::{
        client::ClientBuilder,
        json_rpc::{RequestPacket, ResponsePacket},
    },
    transports::{http::ReqwestTransport, ws::WsConnect, TransportError, TransportResult},
};
use tower::{retry::Policy, Layer, Service};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    backoff: Duration,
    retries: u32,
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(backoff: Duration, max_retries: u32) -> Self {
        Self {
            backoff,
            retries: 0,
            max_retries,
        }
    }

    pub fn backoff(&self) -> tokio::time::Sleep {
        tokio::time::sleep(self.backoff)
    }
}

impl Policy<RequestPacket, ResponsePacket, TransportError> for RetryPolicy {
    type Future = Pin<Box<dyn Future<Output = Self> + Send + 'static>>;

    fn retry(
        &self,
        _req: &RequestPacket,
        result: Result<&ResponsePacket, &TransportError>,
    ) -> Option<Self::Future> {
        match result {
            Err(e) if self.retries < self.max_retries => {
                debug!(
                    "Retrying request after transport error ({}/{}): {e}",
                    self.retries + 1,
                    self.max_retries
                );
                let mut policy = self.clone();
                Some(Box::pin(async move {
                    policy.backoff().await;
                    policy.retries += 1;
                    policy
                }))
            }
            _ => None,
        }
    }

    fn clone_request(&self, req: &RequestPacket) -> Option<RequestPacket> {
        Some(req.clone())
    }
}

/// Wraps a transport in a [`RetryService`] driven by `policy`.
pub struct RetryLayer {
    policy: RetryPolicy,
}

impl RetryLayer {
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService {
            inner,
            policy: self.policy.clone(),
        }
    }
}

/// Re-sends a request to `inner` while its transport fails and the policy
/// has retries left.
#[derive(Debug, Clone)]
pub struct RetryService<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> Service<RequestPacket> for RetryService<S>
where
    S: Service<RequestPacket, Response = ResponsePacket, Error = TransportError>
        + Send
        + 'static
        + Clone,
    S::Future: Send + 'static,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: RequestPacket) -> Self::Future {
        let inner = self.inner.clone();
        let mut policy = self.policy.clone();

        let mut inner = std::mem::replace(&mut self.inner, inner);
        Box::pin(async move {
            let mut res = inner.call(req.clone()).await;

            while let Some(new_policy) = policy.retry(&req, res.as_ref()) {
                policy = new_policy.await;
                res = inner.call(req.clone()).await;
            }

            res
        })
    }
}

fn retry_layer(backoff: u64, max_retries: u32) -> RetryLayer {
    RetryLayer::new(RetryPolicy::new(Duration::from_millis(backoff), max_retries))
}

/// Provider for an `http(s)://` endpoint.
pub fn build_http_retry_provider(
    rpc_url: Url,
    backoff: u64,
    max_retries: u32,
) -> RootProvider<RetryService<ReqwestTransport>> {
    let client = ClientBuilder::default()
        .layer(retry_layer(backoff, max_retries))
        .http(rpc_url);
    ProviderBuilder::new().on_client(client)
}

/// Provider for a `ws(s)://` endpoint. Connects eagerly, so an unreachable
/// node is reported here.
pub async fn build_ws_retry_provider(
    rpc_url: Url,
    backoff: u64,
    max_retries: u32,
) -> TransportResult<RootProvider<RetryService<PubSubFrontend>>> {
    let client = ClientBuilder::default()
        .layer(retry_layer(backoff, max_retries))
        .ws(WsConnect::new(rpc_url))
        .await?;
    Ok(ProviderBuilder::new().on_client(client))
}
