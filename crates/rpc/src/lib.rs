//! JSON-RPC transport to the experiment scheduler.
//!
//! The primary channel is a persistent WebSocket carrying JSON-RPC 2.0
//! frames in both directions: client requests with correlated replies,
//! fire-and-forget client notifications, and unsolicited server pushes.
//! When the socket is down, request/response calls can fall back to a
//! plain HTTP POST endpoint (no pushes in that mode).

pub mod http;
pub mod message;
pub mod proxy;
pub mod socket;

pub use http::HttpRpc;
pub use proxy::ServerProxy;
pub use socket::{connect, SocketConnection, SocketHandle};

/// Errors surfaced by the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The connection dropped before a reply arrived.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The server answered with a JSON-RPC error object.
    #[error("Server error {code}: {message}")]
    Server { code: i64, message: String },

    /// No reply within the call timeout.
    #[error("Call to {method:?} timed out")]
    Timeout { method: String },

    /// The HTTP fallback transport failed.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// A frame or response body was not valid JSON-RPC.
    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Neither the socket nor an HTTP fallback is available.
    #[error("No transport available for {method:?}")]
    Unavailable { method: String },
}
