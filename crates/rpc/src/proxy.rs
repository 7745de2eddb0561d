//! Transport selection between the live socket and the HTTP fallback.
//!
//! [`ServerProxy`] is the single object the rest of the client talks
//! to. The connection supervisor attaches the socket handle when a
//! connection opens and detaches it when it drops; calls made in
//! between go over HTTP when a fallback URL was configured.

use serde_json::Value;
use tokio::sync::RwLock;

use crate::http::HttpRpc;
use crate::socket::SocketHandle;
use crate::RpcError;

pub struct ServerProxy {
    socket: RwLock<Option<SocketHandle>>,
    http: Option<HttpRpc>,
}

impl ServerProxy {
    /// Create a proxy with an optional HTTP fallback endpoint.
    pub fn new(http_url: Option<String>) -> Self {
        Self {
            socket: RwLock::new(None),
            http: http_url.map(HttpRpc::new),
        }
    }

    /// Route calls through a freshly opened socket.
    pub async fn attach(&self, handle: SocketHandle) {
        *self.socket.write().await = Some(handle);
    }

    /// Stop routing through the socket (it dropped).
    pub async fn detach(&self) {
        *self.socket.write().await = None;
    }

    pub async fn is_connected(&self) -> bool {
        self.socket.read().await.is_some()
    }

    /// Issue a request/response call over the best available channel.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let handle = self.socket.read().await.clone();
        if let Some(handle) = handle {
            match handle.call(method, params.clone()).await {
                Err(RpcError::ConnectionClosed) if self.http.is_some() => {
                    tracing::debug!(method, "Socket dropped mid-call, retrying over HTTP");
                }
                outcome => return outcome,
            }
        }

        match &self.http {
            Some(http) => http.call(method, params).await,
            None => Err(RpcError::Unavailable {
                method: method.to_string(),
            }),
        }
    }

    /// Send a fire-and-forget notification. Socket only: the HTTP
    /// fallback has no notification semantics.
    pub async fn notify(&self, method: &str, params: Value) -> Result<(), RpcError> {
        let handle = self.socket.read().await.clone();
        match handle {
            Some(handle) => handle.notify(method, params).await,
            None => Err(RpcError::Unavailable {
                method: method.to_string(),
            }),
        }
    }
}
