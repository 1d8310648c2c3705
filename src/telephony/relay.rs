//! SignalWire Relay session
//!
//! JSON-RPC 2.0 over a websocket. Responses are matched to requests by id;
//! server-pushed `signalwire.event` frames are acknowledged and fanned out to
//! every subscriber.

use super::{ProviderError, Result};
use futures_util::{SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, warn};
use uuid::Uuid;

/// Synthetic event published when the websocket goes away.
pub const SESSION_CLOSED: &str = "relay.session.closed";

const EVENT_CAPACITY: usize = 64;

/// Credentials and limits for opening a session.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Websocket URL, e.g. `wss://relay.signalwire.com`
    pub url: String,
    pub project: String,
    pub token: String,
    pub timeout: Option<Duration>,
}

/// A server-pushed event.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayEvent {
    pub event_type: String,
    pub params: Value,
}

impl RelayEvent {
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<std::result::Result<Value, String>>>>>;

/// An authenticated Relay connection.
pub struct RelaySession {
    outbound: mpsc::UnboundedSender<Message>,
    pending: Pending,
    events: broadcast::Sender<RelayEvent>,
    timeout: Option<Duration>,
    tasks: Vec<JoinHandle<()>>,
}

impl RelaySession {
    /// Open the websocket and run `signalwire.connect`.
    pub async fn connect(config: &RelayConfig) -> Result<Self> {
        let (stream, _) = with_timeout(
            config.timeout,
            "relay connect",
            tokio_tungstenite::connect_async(config.url.as_str()),
        )
        .await?
        .map_err(|e| ProviderError::Connect(e.to_string()))?;

        let (mut sink, source) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let writer = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    warn!(error = %e, "relay write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });
        let reader = tokio::spawn(read_loop(
            source,
            pending.clone(),
            events.clone(),
            outbound.clone(),
        ));

        let session = Self {
            outbound,
            pending,
            events,
            timeout: config.timeout,
            tasks: vec![writer, reader],
        };

        session
            .execute("signalwire.connect", connect_params(&config.project, &config.token))
            .await
            .map_err(|e| ProviderError::Connect(e.to_string()))?;
        debug!(url = %config.url, "relay session established");

        Ok(session)
    }

    /// Receive every event pushed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    /// Issue a request and wait for its response.
    pub async fn execute(&self, method: &str, params: Value) -> Result<Value> {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);

        let frame = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        if self.outbound.send(text_frame(&frame)).is_err() {
            self.pending.lock().remove(&id);
            return Err(ProviderError::Closed);
        }

        let outcome = match with_timeout(self.timeout, method, rx).await {
            Ok(outcome) => outcome.map_err(|_| ProviderError::Closed)?,
            Err(e) => {
                self.pending.lock().remove(&id);
                return Err(e);
            }
        };
        let result = outcome.map_err(|message| ProviderError::Rejected {
            method: method.to_string(),
            message,
        })?;
        check_result_code(method, result)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Wait for the next event, skipping over lag.
pub async fn next_event(rx: &mut broadcast::Receiver<RelayEvent>) -> Result<RelayEvent> {
    loop {
        match rx.recv().await {
            Ok(event) if event.event_type == SESSION_CLOSED => return Err(ProviderError::Closed),
            Ok(event) => return Ok(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "relay event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return Err(ProviderError::Closed),
        }
    }
}

/// Await `fut`, bounded by `limit` when one is configured.
pub async fn with_timeout<F, T>(limit: Option<Duration>, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ProviderError::Timeout(what.to_string())),
        None => Ok(fut.await),
    }
}

async fn read_loop<S>(
    mut source: S,
    pending: Pending,
    events: broadcast::Sender<RelayEvent>,
    outbound: mpsc::UnboundedSender<Message>,
) where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = source.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "relay read failed");
                break;
            }
        };
        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "relay sent malformed frame");
                continue;
            }
        };

        match classify(value) {
            Frame::Response { id, outcome } => {
                if let Some(tx) = pending.lock().remove(&id) {
                    let _ = tx.send(outcome);
                }
            }
            Frame::Event { id, event } => {
                if let Some(id) = id {
                    let _ = outbound.send(ack_frame(&id));
                }
                debug!(event_type = %event.event_type, "relay event");
                let _ = events.send(event);
            }
            Frame::Request { id, method } => {
                debug!(%method, "relay request acknowledged");
                let _ = outbound.send(ack_frame(&id));
            }
            Frame::Other => {}
        }
    }

    // Dropping the senders fails every in-flight request with `Closed`.
    pending.lock().clear();
    let _ = events.send(RelayEvent {
        event_type: SESSION_CLOSED.to_string(),
        params: Value::Null,
    });
}

#[derive(Debug, PartialEq)]
pub(crate) enum Frame {
    Response {
        id: String,
        outcome: std::result::Result<Value, String>,
    },
    Event {
        id: Option<String>,
        event: RelayEvent,
    },
    /// Any other server-initiated request (ping, disconnect).
    Request {
        id: String,
        method: String,
    },
    Other,
}

pub(crate) fn classify(value: Value) -> Frame {
    let id = value.get("id").and_then(Value::as_str).map(str::to_string);
    let method = value.get("method").and_then(Value::as_str);

    match (id, method) {
        (id, Some("signalwire.event")) => {
            let params = value.get("params").cloned().unwrap_or(Value::Null);
            let event_type = params
                .get("event_type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let inner = params.get("params").cloned().unwrap_or(Value::Null);
            Frame::Event {
                id,
                event: RelayEvent {
                    event_type,
                    params: inner,
                },
            }
        }
        (Some(id), Some(method)) => Frame::Request {
            id,
            method: method.to_string(),
        },
        (Some(id), None) => {
            if let Some(error) = value.get("error") {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                Frame::Response {
                    id,
                    outcome: Err(message),
                }
            } else {
                Frame::Response {
                    id,
                    outcome: Ok(value.get("result").cloned().unwrap_or(Value::Null)),
                }
            }
        }
        (None, _) => Frame::Other,
    }
}

/// Calling and messaging results carry an HTTP-like `code`; anything outside
/// 2xx is a rejection even though the RPC itself succeeded.
pub(crate) fn check_result_code(method: &str, result: Value) -> Result<Value> {
    let code = match result.get("code") {
        Some(Value::String(code)) => code.clone(),
        Some(Value::Number(code)) => code.to_string(),
        _ => return Ok(result),
    };
    if code.starts_with('2') {
        return Ok(result);
    }
    let message = result
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message")
        .to_string();
    Err(ProviderError::Rejected {
        method: method.to_string(),
        message: format!("{} ({})", message, code),
    })
}

fn connect_params(project: &str, token: &str) -> Value {
    json!({
        "version": { "major": 3, "minor": 0, "revision": 0 },
        "authentication": { "project": project, "token": token },
        "agent": concat!("otp-relay/", env!("CARGO_PKG_VERSION")),
        "event_acks": true,
    })
}

fn ack_frame(id: &str) -> Message {
    text_frame(&json!({ "jsonrpc": "2.0", "id": id, "result": {} }))
}

fn text_frame(value: &Value) -> Message {
    Message::Text(value.to_string().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_response() {
        let frame = classify(json!({
            "jsonrpc": "2.0",
            "id": "abc",
            "result": { "code": "200", "message_id": "m-1" }
        }));
        assert_eq!(
            frame,
            Frame::Response {
                id: "abc".to_string(),
                outcome: Ok(json!({ "code": "200", "message_id": "m-1" })),
            }
        );
    }

    #[test]
    fn test_classify_error_response() {
        let frame = classify(json!({
            "jsonrpc": "2.0",
            "id": "abc",
            "error": { "code": -32002, "message": "Authentication failed" }
        }));
        assert_eq!(
            frame,
            Frame::Response {
                id: "abc".to_string(),
                outcome: Err("Authentication failed".to_string()),
            }
        );
    }

    #[test]
    fn test_classify_event() {
        let frame = classify(json!({
            "jsonrpc": "2.0",
            "id": "evt-1",
            "method": "signalwire.event",
            "params": {
                "event_type": "calling.call.play",
                "params": { "control_id": "c1", "state": "playing" }
            }
        }));
        match frame {
            Frame::Event { id, event } => {
                assert_eq!(id.as_deref(), Some("evt-1"));
                assert_eq!(event.event_type, "calling.call.play");
                assert_eq!(event.str_param("state"), Some("playing"));
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_classify_ping() {
        assert_eq!(
            classify(json!({ "jsonrpc": "2.0", "id": "p1", "method": "signalwire.ping" })),
            Frame::Request {
                id: "p1".to_string(),
                method: "signalwire.ping".to_string(),
            }
        );
        assert_eq!(classify(json!({ "jsonrpc": "2.0" })), Frame::Other);
    }

    #[test]
    fn test_classify_notification_without_id() {
        assert_eq!(
            classify(json!({ "jsonrpc": "2.0", "method": "signalwire.disconnect" })),
            Frame::Other
        );
    }

    #[test]
    fn test_check_result_code() {
        assert!(check_result_code("calling.play", json!({ "code": "200" })).is_ok());
        assert!(check_result_code("signalwire.connect", json!({ "protocol": "x" })).is_ok());

        let err = check_result_code(
            "messaging.send",
            json!({ "code": "400", "message": "Invalid to_number" }),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ProviderError::Rejected {
                method: "messaging.send".to_string(),
                message: "Invalid to_number (400)".to_string(),
            }
        );
    }

    #[test]
    fn test_connect_params() {
        let params = connect_params("proj", "tok");
        assert_eq!(params["authentication"]["project"], "proj");
        assert_eq!(params["authentication"]["token"], "tok");
        assert_eq!(params["version"]["major"], 3);
    }

    #[tokio::test]
    async fn test_with_timeout() {
        let ok = with_timeout(Some(Duration::from_secs(1)), "fast", async { 7 }).await;
        assert_eq!(ok, Ok(7));

        let slow = with_timeout(
            Some(Duration::from_millis(10)),
            "slow",
            tokio::time::sleep(Duration::from_secs(5)),
        )
        .await;
        assert_eq!(slow, Err(ProviderError::Timeout("slow".to_string())));

        let unbounded = with_timeout(None, "none", async { "done" }).await;
        assert_eq!(unbounded, Ok("done"));
    }

    #[tokio::test]
    async fn test_next_event_stops_on_session_closed() {
        let (tx, mut rx) = broadcast::channel(4);
        tx.send(RelayEvent {
            event_type: "calling.call.play".to_string(),
            params: Value::Null,
        })
        .unwrap();
        tx.send(RelayEvent {
            event_type: SESSION_CLOSED.to_string(),
            params: Value::Null,
        })
        .unwrap();

        assert!(next_event(&mut rx).await.is_ok());
        assert_eq!(next_event(&mut rx).await, Err(ProviderError::Closed));
    }
}
