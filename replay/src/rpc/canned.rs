//! Fixed ("canned") responses to JSON-RPC method calls, for tests.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    future::{pending, ready},
    sync::{Arc, Mutex},
    task::{Context, Poll},
};

use alloy::{
    providers::RootProvider,
    rpc::json_rpc::{
        ErrorPayload, RequestMeta, RequestPacket, Response, ResponsePacket, ResponsePayload,
    },
    transports::{BoxTransport, TransportConnect, TransportError, TransportErrorKind},
};
use futures::{future::BoxFuture, FutureExt as _};
use serde::Serialize;
use serde_json::Value;
use tower::Service;

/// How the node answers one call.
pub(crate) enum Reply {
    Result(Value),
    /// A JSON-RPC error response.
    Error(String),
    /// The connection goes away before an answer arrives.
    Drop,
    /// No answer, ever.
    Hang,
}

impl Reply {
    #[track_caller]
    pub(crate) fn result(response: impl Serialize) -> Self {
        Reply::Result(serde_json::to_value(response).expect("serialization failure"))
    }
}

type Handler = Arc<dyn Fn(&Value) -> Reply + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct Canned {
    method2handler: BTreeMap<String, Handler>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Canned {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Always answers `method` with `response`.
    #[track_caller]
    pub(crate) fn respond(self, method: impl Into<String>, response: impl Serialize) -> Self {
        let response = serde_json::to_value(response).expect("serialization failure");
        self.respond_with(method, move |_| Reply::Result(response.clone()))
    }

    /// Answers `method` with whatever `handler` makes of the call's params.
    #[track_caller]
    pub(crate) fn respond_with(
        mut self,
        method: impl Into<String>,
        handler: impl Fn(&Value) -> Reply + Send + Sync + 'static,
    ) -> Self {
        let clobbered = self
            .method2handler
            .insert(method.into(), Arc::new(handler));
        assert!(
            clobbered.is_none(),
            "duplicate response registered - this is probably not what you want"
        );
        self
    }

    /// Every `(method, params)` received so far, in order.
    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn into_provider(self) -> RootProvider<BoxTransport> {
        RootProvider::connect_boxed(self)
            .now_or_never()
            .expect("Canned::get_transport is non blocking")
            .expect("Canned::get_transport is infallible")
    }
}

impl TransportConnect for Canned {
    type Transport = Self;
    fn is_local(&self) -> bool {
        true
    }
    fn get_transport<'a: 'b, 'b>(
        &'a self,
    ) -> BoxFuture<'b, Result<Self::Transport, TransportError>> {
        ready(Ok(self.clone())).boxed()
    }
}

impl Service<RequestPacket> for Canned {
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;
    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
    fn call(&mut self, req: RequestPacket) -> Self::Future {
        fn error_payload(message: impl Into<Cow<'static, str>>) -> ErrorPayload {
            ErrorPayload {
                code: -32000,
                message: message.into().into_owned(),
                data: None,
            }
        }

        match req {
            RequestPacket::Single(it) => {
                let (RequestMeta { method, id, .. }, request) = it.decompose();
                let params = serde_json::from_str::<Value>(request.get())
                    .ok()
                    .and_then(|mut request| request.get_mut("params").map(Value::take))
                    .unwrap_or(Value::Null);
                self.calls
                    .lock()
                    .unwrap()
                    .push((method.to_string(), params.clone()));

                let reply = match self.method2handler.get(&*method) {
                    Some(handler) => handler(&params),
                    None => Reply::Error(format!("method {method} not implemented")),
                };
                let payload = match reply {
                    Reply::Result(value) => ResponsePayload::Success(
                        serde_json::value::to_raw_value(&value).unwrap(),
                    ),
                    Reply::Error(message) => ResponsePayload::Failure(error_payload(message)),
                    Reply::Drop => return ready(Err(TransportErrorKind::backend_gone())).boxed(),
                    Reply::Hang => return pending().boxed(),
                };
                ready(Ok(ResponsePacket::Single(Response { id, payload }))).boxed()
            }
            RequestPacket::Batch(_) => ready(Err(TransportError::ErrorResp(error_payload(
                "batched messages are not supported",
            ))))
            .boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::providers::Provider as _;
    use futures::FutureExt as _;

    use super::*;

    #[test]
    fn eth_block_number() {
        let expected = 100;
        let actual = Canned::new()
            .respond("eth_blockNumber", format!("{expected:#x}"))
            .into_provider()
            .get_block_number()
            .now_or_never()
            .unwrap()
            .unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    #[should_panic = "method eth_blockNumber not implemented"]
    fn not_implemented() {
        Canned::new()
            .into_provider()
            .get_block_number()
            .now_or_never()
            .unwrap()
            .unwrap();
    }

    #[test]
    fn records_params() {
        let canned = Canned::new().respond("eth_blockNumber", "0x1");
        canned
            .clone()
            .into_provider()
            .get_block_number()
            .now_or_never()
            .unwrap()
            .unwrap();
        assert_eq!(canned.calls().len(), 1);
        assert_eq!(canned.calls()[0].0, "eth_blockNumber");
    }
}
