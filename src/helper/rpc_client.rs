//! # RPC Client Module
//!
//! Blocking XML-RPC client for the DAEDALUS engine. Every request carries the
//! configured timeout; [`RpcClient::spawn_calc`] moves a call onto a worker thread and
//! hands back a [`PendingCall`] the UI can poll once per frame; cancelling the token
//! resolves it at once.
//!
//! There are no retries. A call either produces a value or one of the [`RpcError`] kinds.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, TryRecvError},
    },
    time::Duration,
};

use reqwest::header::CONTENT_TYPE;

use crate::{
    error::RpcError,
    helper::xmlrpc::{
        Call, MethodResponse, Value, decode_multicall_results, decode_response, encode_call,
        encode_multicall,
    },
    session::CalcRequest,
};

/// Name of the engine's single remote operation.
pub const CALC_METHOD: &str = "calc";

const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Shared flag that resolves a [`PendingCall`] to [`RpcError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// XML-RPC over HTTP POST to a single endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl RpcClient {
    /// Builds a client for `endpoint` (for example `http://localhost:4242/`).
    ///
    /// # Arguments
    ///
    /// * `timeout` - Upper bound for a whole request, connect included.
    /// * `connect_timeout` - Upper bound for establishing the TCP connection.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, RpcError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    /// Invokes `method` and returns its result value.
    pub fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        let body = encode_call(method, params)?;
        match decode_response(&self.post(body)?)? {
            MethodResponse::Success(value) => Ok(value),
            MethodResponse::Fault(fault) => Err(RpcError::Fault {
                code: fault.code,
                message: fault.message,
            }),
        }
    }

    /// Invokes the engine's `calc` with the request's five positional parameters.
    pub fn calc(&self, request: &CalcRequest) -> Result<Value, RpcError> {
        tracing::info!(
            endpoint = %self.endpoint,
            project = %request.project_name,
            "Calling {}",
            CALC_METHOD
        );
        let result = self.call(CALC_METHOD, &calc_params(request));
        match &result {
            Ok(value) => tracing::info!("Engine finished: {:?}", value),
            Err(e) => tracing::warn!("Engine call failed: {}", e),
        }
        result
    }

    /// Submits several `calc` jobs in one `system.multicall` round trip.
    ///
    /// The outer error covers the transport; inner results are per job.
    pub fn multicall_calc(
        &self,
        requests: &[CalcRequest],
    ) -> Result<Vec<Result<Value, RpcError>>, RpcError> {
        let calls: Vec<Call> = requests
            .iter()
            .map(|request| Call {
                method: CALC_METHOD.to_string(),
                params: calc_params(request),
            })
            .collect();

        tracing::info!(endpoint = %self.endpoint, jobs = calls.len(), "Submitting batch");
        let body = encode_multicall(&calls)?;
        let value = match decode_response(&self.post(body)?)? {
            MethodResponse::Success(value) => value,
            MethodResponse::Fault(fault) => {
                return Err(RpcError::Fault {
                    code: fault.code,
                    message: fault.message,
                });
            }
        };

        let results = decode_multicall_results(value)?
            .into_iter()
            .map(|response| match response {
                MethodResponse::Success(value) => Ok(value),
                MethodResponse::Fault(fault) => Err(RpcError::Fault {
                    code: fault.code,
                    message: fault.message,
                }),
            })
            .collect();
        Ok(results)
    }

    /// Runs [`RpcClient::calc`] on a worker thread.
    pub fn spawn_calc(&self, request: CalcRequest, token: CancellationToken) -> PendingCall {
        let (sender, receiver) = mpsc::channel();
        let client = self.clone();

        std::thread::spawn(move || {
            let result = client.calc(&request);
            // The receiver is gone when the call was cancelled or the window closed.
            let _ = sender.send(result);
        });

        PendingCall { receiver, token }
    }

    fn post(&self, body: String) -> Result<String, RpcError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Http(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

fn calc_params(request: &CalcRequest) -> Vec<Value> {
    request.params().into_iter().map(Value::from).collect()
}

/// A call running on a worker thread.
#[derive(Debug)]
pub struct PendingCall {
    receiver: Receiver<Result<Value, RpcError>>,
    token: CancellationToken,
}

impl PendingCall {
    /// Non-blocking check. `None` while the engine is still working.
    pub fn poll(&self) -> Option<Result<Value, RpcError>> {
        if self.token.is_cancelled() {
            return Some(Err(RpcError::Cancelled));
        }
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(RpcError::Transport(
                "worker thread exited without a result".to_string(),
            ))),
        }
    }

    /// Blocks until the call finishes or the token is cancelled.
    pub fn wait(self) -> Result<Value, RpcError> {
        loop {
            if self.token.is_cancelled() {
                return Err(RpcError::Cancelled);
            }
            match self.receiver.recv_timeout(WAIT_SLICE) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(RpcError::Transport(
                        "worker thread exited without a result".to_string(),
                    ));
                }
            }
        }
    }
}
