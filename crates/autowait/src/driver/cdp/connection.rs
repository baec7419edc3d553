//! JSON-RPC connection layer for the DevTools protocol
//!
//! Commands carry a connection-unique `id` and an optional `sessionId` (flat
//! session mode). Responses are routed back to the caller through a oneshot
//! channel; everything without an `id` is an event and is broadcast.

use super::transport::{TransportReceiver, TransportSender};
use crate::driver::EVENT_CHANNEL_CAPACITY;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Command sent to the browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub params: Value,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Reply to a command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Unsolicited notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Response(Response),
    Event(Event),
}

type Callbacks = HashMap<u64, oneshot::Sender<Result<Value>>>;

/// JSON-RPC connection to a DevTools endpoint
pub struct Connection {
    last_id: AtomicU64,
    closed: AtomicBool,
    callbacks: Mutex<Callbacks>,
    sender: TokioMutex<Box<dyn TransportSender>>,
    message_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    transport_receiver: Mutex<Option<Box<dyn TransportReceiver>>>,
    events: broadcast::Sender<Event>,
}

impl Connection {
    pub fn new(
        sender: impl TransportSender + 'static,
        receiver: impl TransportReceiver + 'static,
        message_rx: mpsc::UnboundedReceiver<Value>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            last_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            callbacks: Mutex::new(HashMap::new()),
            sender: TokioMutex::new(Box::new(sender)),
            message_rx: Mutex::new(Some(message_rx)),
            transport_receiver: Mutex::new(Some(Box::new(receiver))),
            events,
        }
    }

    /// Subscribe to protocol events. Subscribe before issuing the command
    /// that triggers them.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sends a command and waits for its response.
    pub async fn send(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }
        let id = self.last_id.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            "Sending command: id={}, method='{}', session={:?}",
            id,
            method,
            session_id
        );

        let (tx, rx) = oneshot::channel();
        self.callbacks.lock().insert(id, tx);

        let request = Request {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(str::to_string),
        };
        let request_value = serde_json::to_value(&request)?;

        if let Err(e) = self.sender.lock().await.send(request_value).await {
            tracing::error!("Failed to send command {}: {}", method, e);
            self.callbacks.lock().remove(&id);
            return Err(e);
        }

        rx.await
            .map_err(|_| Error::ChannelClosed)
            .and_then(|result| result)
    }

    /// Runs the receive loop until the transport closes. Call once.
    pub async fn run(self: &Arc<Self>) {
        let (Some(mut transport_receiver), Some(mut message_rx)) = (
            self.transport_receiver.lock().take(),
            self.message_rx.lock().take(),
        ) else {
            tracing::warn!("Connection::run called twice");
            return;
        };

        let transport_handle = tokio::spawn(async move {
            if let Err(e) = transport_receiver.run().await {
                tracing::error!("Transport error: {}", e);
            }
        });

        while let Some(message_value) = message_rx.recv().await {
            match serde_json::from_value::<Message>(message_value) {
                Ok(message) => self.dispatch(message),
                Err(e) => tracing::error!("Failed to parse message: {}", e),
            }
        }

        tracing::debug!("Message loop ended (transport closed)");
        self.closed.store(true, Ordering::SeqCst);
        // Pending callers see ChannelClosed.
        self.callbacks.lock().clear();
        let _ = transport_handle.await;
    }

    pub(crate) fn dispatch(&self, message: Message) {
        match message {
            Message::Response(response) => {
                let Some(callback) = self.callbacks.lock().remove(&response.id) else {
                    tracing::warn!("Cannot find request to respond: id={}", response.id);
                    return;
                };
                let result = match response.error {
                    Some(error) => Err(parse_protocol_error(error)),
                    None => Ok(response.result.unwrap_or(Value::Null)),
                };
                let _ = callback.send(result);
            }
            Message::Event(event) => {
                tracing::trace!("Event {} (session {:?})", event.method, event.session_id);
                let _ = self.events.send(event);
            }
        }
    }
}

fn parse_protocol_error(payload: ErrorPayload) -> Error {
    match payload.data {
        Some(data) => Error::ProtocolError(format!(
            "{} ({}): {}",
            payload.message, payload.code, data
        )),
        None => Error::ProtocolError(format!("{} ({})", payload.message, payload.code)),
    }
}

/// True for protocol errors raised because the page's document went away
/// while a command was in flight.
pub(crate) fn is_context_gone(error: &Error) -> bool {
    match error {
        Error::ProtocolError(message) => {
            message.contains("Execution context was destroyed")
                || message.contains("Cannot find context with specified id")
                || message.contains("Inspected target navigated or closed")
                || message.contains("Session with given id not found")
        }
        Error::Context(_, source) => is_context_gone(source),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_and_event_are_distinguished() {
        let response: Message =
            serde_json::from_value(json!({"id": 4, "result": {"frameId": "F1"}})).unwrap();
        assert!(matches!(response, Message::Response(Response { id: 4, .. })));

        let event: Message = serde_json::from_value(json!({
            "method": "Page.loadEventFired",
            "params": {"timestamp": 1.5},
            "sessionId": "S1"
        }))
        .unwrap();
        match event {
            Message::Event(event) => {
                assert_eq!(event.method, "Page.loadEventFired");
                assert_eq!(event.session_id.as_deref(), Some("S1"));
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn test_request_omits_absent_session() {
        let request = Request {
            id: 1,
            method: "Target.setDiscoverTargets".to_string(),
            params: json!({"discover": true}),
            session_id: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("sessionId").is_none());
    }

    #[test]
    fn test_context_gone_detection() {
        let err = parse_protocol_error(ErrorPayload {
            code: -32000,
            message: "Execution context was destroyed.".to_string(),
            data: None,
        });
        assert!(is_context_gone(&err));
        assert!(!is_context_gone(&Error::ProtocolError("Invalid parameters".to_string())));
    }
}
