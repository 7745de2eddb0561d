//! Persistent WebSocket JSON-RPC channel.
//!
//! [`connect`] establishes the socket and spawns a reader and a writer
//! task. The reader resolves replies against a pending-call map keyed
//! by request id and forwards everything else to the notification
//! channel. When the socket drops, every pending call fails with
//! [`RpcError::ConnectionClosed`] and the notification channel closes,
//! which is how the supervisor observes the disconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::message::{parse_incoming, Notification, Request};
use crate::RpcError;

/// Time to wait for a reply before a call fails.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffered outgoing frames before `call`/`notify` apply backpressure.
const OUTGOING_BUFFER: usize = 64;

/// Buffered server pushes before the reader applies backpressure.
const NOTIFICATION_BUFFER: usize = 256;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, RpcError>>>>>;

/// Cheaply cloneable handle for issuing calls and notifications over
/// an established socket.
#[derive(Clone)]
pub struct SocketHandle {
    outgoing: mpsc::Sender<Message>,
    pending: Pending,
    next_id: Arc<AtomicU64>,
}

/// A live connection: the handle plus the stream of server pushes.
///
/// The notification receiver yields the raw JSON payload of each push;
/// it ends when the socket closes.
pub struct SocketConnection {
    pub handle: SocketHandle,
    pub notifications: mpsc::Receiver<Value>,
}

/// Connect to the scheduler's WebSocket endpoint.
pub async fn connect(ws_url: &str) -> Result<SocketConnection, RpcError> {
    let (ws_stream, _response) = connect_async(ws_url)
        .await
        .map_err(|e| RpcError::Connection(format!("Failed to connect to {ws_url}: {e}")))?;

    tracing::info!(url = %ws_url, "Connected to scheduler");

    Ok(spawn_io(ws_stream))
}

/// Split the stream and spawn the reader/writer tasks.
fn spawn_io(ws_stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>) -> SocketConnection {
    let (mut sink, mut stream) = ws_stream.split();
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(OUTGOING_BUFFER);
    let (notify_tx, notify_rx) = mpsc::channel::<Value>(NOTIFICATION_BUFFER);
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

    tokio::spawn(async move {
        while let Some(frame) = outgoing_rx.recv().await {
            if let Err(e) = sink.send(frame).await {
                tracing::error!(error = %e, "WebSocket send error");
                break;
            }
        }
    });

    let reader_pending = Arc::clone(&pending);
    tokio::spawn(async move {
        while let Some(msg_result) = stream.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    route_frame(&text, &reader_pending, &notify_tx).await;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Handled automatically by tungstenite.
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!(?frame, "Scheduler closed WebSocket");
                    break;
                }
                Ok(_) => {
                    // Binary / raw frames carry nothing for us.
                }
                Err(e) => {
                    tracing::error!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
        fail_pending(&reader_pending);
        // notify_tx drops here, closing the notification stream.
    });

    SocketConnection {
        handle: SocketHandle {
            outgoing: outgoing_tx,
            pending,
            next_id: Arc::new(AtomicU64::new(1)),
        },
        notifications: notify_rx,
    }
}

/// Route one incoming text frame: resolve a pending call by id, or
/// forward the payload as a server push.
async fn route_frame(text: &str, pending: &Pending, notify_tx: &mpsc::Sender<Value>) {
    let incoming = match parse_incoming(text) {
        Ok(incoming) => incoming,
        Err(e) => {
            tracing::warn!(error = %e, raw = %text, "Malformed JSON-RPC frame");
            return;
        }
    };

    if let Some(id) = incoming.id {
        let waiter = pending.lock().expect("pending map poisoned").remove(&id);
        if let Some(waiter) = waiter {
            let outcome = match incoming.error {
                Some(error) => Err(RpcError::Server {
                    code: error.code,
                    message: error.message,
                }),
                None => Ok(incoming.result.unwrap_or(Value::Null)),
            };
            let _ = waiter.send(outcome);
            return;
        }
        // An id we never issued: the scheduler's event stream arrives
        // as response-shaped frames. Fall through to the push path.
    }

    match incoming.into_push_payload() {
        Some(payload) => {
            if notify_tx.send(payload).await.is_err() {
                tracing::debug!("Notification receiver dropped, discarding push");
            }
        }
        None => {
            tracing::warn!(raw = %text, "Unroutable JSON-RPC frame");
        }
    }
}

/// Fail every in-flight call; used when the connection drops.
fn fail_pending(pending: &Pending) {
    let waiters: Vec<_> = pending
        .lock()
        .expect("pending map poisoned")
        .drain()
        .collect();
    for (_, waiter) in waiters {
        let _ = waiter.send(Err(RpcError::ConnectionClosed));
    }
}

impl SocketHandle {
    /// Issue a request and await its reply.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending
            .lock()
            .expect("pending map poisoned")
            .insert(id, reply_tx);

        let request = Request::new(id, method, params);
        let json = serde_json::to_string(&request).expect("Request is always serialisable");

        if self.outgoing.send(Message::Text(json)).await.is_err() {
            self.pending
                .lock()
                .expect("pending map poisoned")
                .remove(&id);
            return Err(RpcError::ConnectionClosed);
        }

        match tokio::time::timeout(CALL_TIMEOUT, reply_rx).await {
            Ok(Ok(outcome)) => outcome,
            // Reader dropped the sender: connection went away.
            Ok(Err(_)) => Err(RpcError::ConnectionClosed),
            Err(_) => {
                self.pending
                    .lock()
                    .expect("pending map poisoned")
                    .remove(&id);
                Err(RpcError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }

    /// Send a fire-and-forget notification.
    pub async fn notify(&self, method: &str, params: Value) -> Result<(), RpcError> {
        let note = Notification::new(method, params);
        let json = serde_json::to_string(&note).expect("Notification is always serialisable");
        self.outgoing
            .send(Message::Text(json))
            .await
            .map_err(|_| RpcError::ConnectionClosed)
    }
}
