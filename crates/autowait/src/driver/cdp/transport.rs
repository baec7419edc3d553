// DevTools transport layer
//
// WebSocket connection to a browser's DevTools endpoint. The socket is split
// into a sending half, shared behind a lock by everyone issuing commands, and
// a receiving half that forwards every parsed JSON frame to a channel.

use crate::error::{Error, Result};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message as Frame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Sending half of a transport.
#[async_trait]
pub trait TransportSender: Send {
    async fn send(&mut self, message: Value) -> Result<()>;
}

/// Receiving half of a transport.
#[async_trait]
pub trait TransportReceiver: Send {
    /// Forwards frames until the peer closes the socket.
    async fn run(&mut self) -> Result<()>;
}

/// WebSocket transport to a DevTools endpoint
pub struct WebSocketTransport {
    frames: mpsc::UnboundedSender<Value>,
    sink: SplitSink<Socket, Frame>,
    stream: SplitStream<Socket>,
}

/// Handshake request for `endpoint`, which must be a `ws://` or `wss://` URL.
fn handshake_request(endpoint: &str, headers: Option<HashMap<String, String>>) -> Result<Request> {
    let url = Url::parse(endpoint)
        .map_err(|e| Error::TransportError(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(Error::TransportError(format!(
            "Expected a ws:// or wss:// endpoint, got '{}'",
            endpoint
        )));
    }

    let mut request = endpoint
        .into_client_request()
        .map_err(|e| Error::TransportError(format!("Bad handshake request: {}", e)))?;
    for (name, value) in headers.unwrap_or_default() {
        let header = HeaderName::from_str(&name)
            .map_err(|e| Error::TransportError(format!("Header '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(&value)
            .map_err(|e| Error::TransportError(format!("Header '{}' value: {}", name, e)))?;
        request.headers_mut().insert(header, value);
    }
    Ok(request)
}

impl WebSocketTransport {
    /// Opens the socket. Frames arrive on the returned receiver once the
    /// receiving half is running.
    pub async fn connect(
        endpoint: &str,
        headers: Option<HashMap<String, String>>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Value>)> {
        let request = handshake_request(endpoint, headers)?;
        let (socket, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| Error::ConnectionFailed(format!("{}: {}", endpoint, e)))?;
        tracing::debug!("DevTools socket open: {}", endpoint);

        let (frames, frames_rx) = mpsc::unbounded_channel();
        let (sink, stream) = socket.split();
        Ok((Self { frames, sink, stream }, frames_rx))
    }

    pub fn into_parts(self) -> (WebSocketTransportSender, WebSocketTransportReceiver) {
        (
            WebSocketTransportSender { sink: self.sink },
            WebSocketTransportReceiver {
                stream: self.stream,
                frames: self.frames,
            },
        )
    }
}

pub struct WebSocketTransportSender {
    sink: SplitSink<Socket, Frame>,
}

pub struct WebSocketTransportReceiver {
    stream: SplitStream<Socket>,
    frames: mpsc::UnboundedSender<Value>,
}

#[async_trait]
impl TransportSender for WebSocketTransportSender {
    async fn send(&mut self, message: Value) -> Result<()> {
        self.sink
            .send(Frame::text(message.to_string()))
            .await
            .map_err(|e| Error::TransportError(format!("Send failed: {}", e)))
    }
}

#[async_trait]
impl TransportReceiver for WebSocketTransportReceiver {
    async fn run(&mut self) -> Result<()> {
        while let Some(frame) = self.stream.next().await {
            let frame = frame.map_err(|e| Error::TransportError(format!("Read failed: {}", e)))?;
            let text = match frame {
                Frame::Text(text) => text,
                Frame::Close(_) => break,
                // DevTools only speaks text frames
                Frame::Binary(_) => {
                    tracing::warn!("Ignoring binary DevTools frame");
                    continue;
                }
                _ => continue,
            };
            let message: Value = serde_json::from_str(text.as_str())
                .map_err(|e| Error::ProtocolError(format!("Malformed frame: {}", e)))?;
            if self.frames.send(message).is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_http_endpoint() {
        let err = handshake_request("http://127.0.0.1:9222/json", None).unwrap_err();
        assert!(err.to_string().contains("ws://"), "{err}");
    }

    #[test]
    fn test_rejects_unparseable_endpoint() {
        assert!(matches!(
            handshake_request("not a url", None),
            Err(Error::TransportError(_))
        ));
    }

    #[test]
    fn test_handshake_headers() {
        let headers = HashMap::from([("x-token".to_string(), "abc".to_string())]);
        let request = handshake_request("ws://127.0.0.1:9222/devtools/browser/1", Some(headers))
            .unwrap();
        assert_eq!(request.headers()["x-token"], "abc");

        let bad = HashMap::from([("bad header".to_string(), "v".to_string())]);
        assert!(handshake_request("ws://127.0.0.1:9222/", Some(bad)).is_err());
    }
}
