//! JSON-RPC 2.0 envelope types.
//!
//! Outgoing frames are [`Request`] (expects a correlated reply) and
//! [`Notification`] (fire-and-forget). Incoming frames all parse into
//! [`Incoming`]; the socket reader decides from the `id` whether a
//! frame answers a pending call or is a server push.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Outgoing request with a correlated reply.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

/// Outgoing fire-and-forget notification (no `id`, no reply).
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC error object returned by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

/// Any incoming frame: a reply (`result` or `error` with an `id` we
/// issued), a server-initiated request (`method` + `params`), or a
/// push delivered as a response-shaped frame with an `id` we never
/// issued -- the scheduler uses the latter for its event stream.
#[derive(Debug, Clone, Deserialize)]
pub struct Incoming {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorObject>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Incoming {
    /// The payload of a server push: `params` for request-shaped
    /// frames, `result` for response-shaped ones.
    pub fn into_push_payload(self) -> Option<Value> {
        match (self.method, self.params, self.result) {
            (Some(_), Some(params), _) => Some(params),
            (_, _, Some(result)) => Some(result),
            _ => None,
        }
    }
}

/// Parse one incoming text frame.
///
/// Malformed frames are the caller's problem to log and drop; they
/// must never tear down the connection.
pub fn parse_incoming(text: &str) -> Result<Incoming, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_version_and_id() {
        let req = Request::new(7, "listen", serde_json::json!({}));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "listen");
    }

    #[test]
    fn notification_has_no_id() {
        let note = Notification::new("ping", serde_json::json!({}));
        let value = serde_json::to_value(&note).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["method"], "ping");
    }

    #[test]
    fn parses_reply_with_result() {
        let incoming = parse_incoming(r#"{"jsonrpc":"2.0","id":3,"result":{"ok":true}}"#).unwrap();
        assert_eq!(incoming.id, Some(3));
        assert!(incoming.result.is_some());
        assert!(incoming.error.is_none());
    }

    #[test]
    fn parses_reply_with_error() {
        let incoming =
            parse_incoming(r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32000,"message":"boom"}}"#)
                .unwrap();
        let error = incoming.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "boom");
    }

    #[test]
    fn push_payload_prefers_params_for_method_frames() {
        let incoming = parse_incoming(
            r#"{"jsonrpc":"2.0","method":"event","params":{"event":"PROGRESS"}}"#,
        )
        .unwrap();
        let payload = incoming.into_push_payload().unwrap();
        assert_eq!(payload["event"], "PROGRESS");
    }

    #[test]
    fn push_payload_uses_result_for_response_shaped_frames() {
        let incoming = parse_incoming(
            r#"{"jsonrpc":"2.0","id":999,"result":{"event":"STATE_CHANGED","id":4,"state":"DONE"}}"#,
        )
        .unwrap();
        let payload = incoming.into_push_payload().unwrap();
        assert_eq!(payload["event"], "STATE_CHANGED");
    }

    #[test]
    fn malformed_frame_is_an_error() {
        assert!(parse_incoming("not json").is_err());
    }
}
