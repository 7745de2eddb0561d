//! Plain HTTP fallback for request/response calls.
//!
//! Posts one JSON-RPC envelope per call to the scheduler's `/json-rpc`
//! endpoint. Used when the WebSocket is unavailable; server pushes are
//! not delivered in this mode.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::message::{Incoming, Request};
use crate::RpcError;

pub struct HttpRpc {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Issue one request/response call over HTTP.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request::new(id, method, params);

        tracing::debug!(method, id, url = %self.url, "JSON-RPC call over HTTP fallback");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let incoming: Incoming = response.json().await?;
        match incoming.error {
            Some(error) => Err(RpcError::Server {
                code: error.code,
                message: error.message,
            }),
            None => Ok(incoming.result.unwrap_or(Value::Null)),
        }
    }
}
