//! Chrome DevTools Protocol backend
//!
//! Connects to a running Chromium through its browser-level DevTools
//! WebSocket (`--remote-debugging-port`). Page targets are auto-attached in
//! flat session mode; their lifecycle and navigation events are translated
//! into [`DriverEvent`]s by a background task.
//!
//! Elements are tracked by an in-page registry (`window.__autowait`) that
//! hands out numeric ids per document. A new document gets a new registry,
//! so handles from an older document report as stale.

mod connection;
mod scripts;
mod transport;

pub use connection::{Connection, Event, Message, Request, Response};
pub use transport::{
    TransportReceiver, TransportSender, WebSocketTransport, WebSocketTransportReceiver,
    WebSocketTransportSender,
};

use crate::api::ConnectOptions;
use crate::api::DEFAULT_TIMEOUT;
use crate::driver::{
    ActionableState, BrowserDriver, ContextId, ContextInfo, DriverEvent, ElementHandle,
    ElementRef, EVENT_CHANNEL_CAPACITY, LoadState,
};
use crate::error::{Error, Result};
use crate::protocol::{SelectOption, Selector, SelectorStep};
use async_trait::async_trait;
use connection::is_context_gone;
use parking_lot::Mutex;
use scripts::ElementScript;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct CdpContext {
    id: ContextId,
    session_id: String,
    opener: Option<ContextId>,
    url: String,
    load_state: Option<LoadState>,
}

struct Shared {
    connection: Arc<Connection>,
    contexts: Mutex<Vec<CdpContext>>,
    events: broadcast::Sender<DriverEvent>,
}

// Aborts the background tasks when the last driver clone goes away.
struct Tasks(Vec<JoinHandle<()>>);

impl Drop for Tasks {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}

/// Browser driven over the Chrome DevTools Protocol.
///
/// # Example
///
/// ```ignore
/// use autowait::{BrowserContext, ConnectOptions};
/// use autowait::driver::cdp::CdpDriver;
///
/// # async fn example() -> autowait::Result<()> {
/// let driver = CdpDriver::connect(ConnectOptions::new(
///     "ws://127.0.0.1:9222/devtools/browser/2f1c…",
/// ))
/// .await?;
/// let context = BrowserContext::new(driver).await?;
/// let page = context.new_page("https://www.saucedemo.com/").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CdpDriver {
    shared: Arc<Shared>,
    _tasks: Arc<Tasks>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TargetInfo {
    #[serde(rename = "targetId")]
    target_id: String,
    #[serde(rename = "type")]
    target_type: String,
    #[serde(default)]
    url: String,
    #[serde(rename = "openerId")]
    opener_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachedToTarget {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "targetInfo")]
    target_info: TargetInfo,
}

#[derive(Debug, Deserialize)]
struct PageState {
    url: String,
    #[serde(rename = "readyState")]
    ready_state: String,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    doc: u64,
    ids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

impl CdpDriver {
    /// Connects to a browser-level DevTools endpoint and attaches to every
    /// page target, including ones opened later.
    pub async fn connect(options: ConnectOptions) -> Result<Self> {
        let timeout = options.timeout.unwrap_or(DEFAULT_TIMEOUT);
        tracing::debug!("Connecting to DevTools endpoint {}", options.endpoint);

        let (transport, message_rx) = tokio::time::timeout(
            timeout,
            WebSocketTransport::connect(&options.endpoint, options.headers),
        )
        .await
        .map_err(|_| {
            Error::ConnectionFailed(format!(
                "Timed out after {:?} connecting to {}",
                timeout, options.endpoint
            ))
        })??;
        let (sender, receiver) = transport.into_parts();
        let connection = Arc::new(Connection::new(sender, receiver, message_rx));

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            connection: Arc::clone(&connection),
            contexts: Mutex::new(Vec::new()),
            events,
        });

        // Subscribe before auto-attach so no attachment is missed.
        let protocol_events = connection.subscribe();
        let run_task = {
            let connection = Arc::clone(&connection);
            tokio::spawn(async move { connection.run().await })
        };
        let translate_task = tokio::spawn(translate(Arc::clone(&shared), protocol_events));

        let driver = Self {
            shared,
            _tasks: Arc::new(Tasks(vec![run_task, translate_task])),
            timeout,
        };

        connection
            .send("Target.setDiscoverTargets", json!({"discover": true}), None)
            .await?;
        connection
            .send(
                "Target.setAutoAttach",
                json!({"autoAttach": true, "waitForDebuggerOnStart": true, "flatten": true}),
                None,
            )
            .await?;
        Ok(driver)
    }

    fn session(&self, context: &ContextId) -> Option<String> {
        self.shared
            .contexts
            .lock()
            .iter()
            .find(|c| &c.id == context)
            .map(|c| c.session_id.clone())
    }

    async fn evaluate(&self, session: &str, expression: String) -> Result<Value> {
        let response = self
            .shared
            .connection
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
                Some(session),
            )
            .await?;
        if let Some(details) = response.get("exceptionDetails") {
            let text = details["exception"]["description"]
                .as_str()
                .or_else(|| details["text"].as_str())
                .unwrap_or("unknown exception");
            return Err(Error::ProtocolError(format!("Page script failed: {}", text)));
        }
        Ok(response["result"]["value"].clone())
    }

    // Runs an element script and unwraps its {stale}/{error}/{value} reply.
    async fn call(
        &self,
        element: &ElementHandle,
        script: ElementScript,
        arg: Value,
    ) -> Result<Value> {
        let Some(session) = self.session(element.context()) else {
            return Err(Error::StaleElement(format!("{element}: context is closed")));
        };
        let ElementRef { document, node } = element.element();
        let expression = script.expression(document, node, &arg)?;
        let reply = match self.evaluate(&session, expression).await {
            Ok(reply) => reply,
            Err(e) if is_context_gone(&e) => {
                return Err(Error::StaleElement(format!("{element}: document was replaced")));
            }
            Err(e) => return Err(e),
        };
        if reply["stale"].as_bool() == Some(true) {
            return Err(Error::StaleElement(format!("{element}: node is detached")));
        }
        if let Some(message) = reply["error"].as_str() {
            return Err(Error::InvalidArgument(message.to_string()));
        }
        Ok(reply["value"].clone())
    }

    async fn mouse(&self, session: &str, kind: &str, point: &Point) -> Result<()> {
        self.shared
            .connection
            .send(
                "Input.dispatchMouseEvent",
                json!({
                    "type": kind,
                    "x": point.x,
                    "y": point.y,
                    "button": "left",
                    "buttons": if kind == "mouseReleased" { 0 } else { 1 },
                    "clickCount": 1,
                }),
                Some(session),
            )
            .await
            .map(|_| ())
    }

    fn resolve_url(&self, context: &ContextId, href: &str) -> String {
        let base = self
            .shared
            .contexts
            .lock()
            .iter()
            .find(|c| &c.id == context)
            .map(|c| c.url.clone());
        base.and_then(|base| url::Url::parse(&base).ok())
            .and_then(|base| base.join(href).ok())
            .map(String::from)
            .unwrap_or_else(|| href.to_string())
    }
}

fn steps_json(selector: &Selector) -> Value {
    Value::Array(
        selector
            .steps()
            .iter()
            .map(|step| match step {
                SelectorStep::Css(css) => json!({"css": css}),
                SelectorStep::Parent => json!({"parent": true}),
                SelectorStep::Nth(index) => json!({"nth": index}),
            })
            .collect(),
    )
}

impl Shared {
    fn emit(&self, event: DriverEvent) {
        let _ = self.events.send(event);
    }

    fn update(&self, session_id: &str, apply: impl FnOnce(&mut CdpContext) -> Option<DriverEvent>) {
        let event = self
            .contexts
            .lock()
            .iter_mut()
            .find(|c| c.session_id == session_id)
            .and_then(apply);
        if let Some(event) = event {
            self.emit(event);
        }
    }

    fn close(&self, target_id: &str) {
        let removed = {
            let mut contexts = self.contexts.lock();
            let before = contexts.len();
            contexts.retain(|c| c.id.as_str() != target_id);
            contexts.len() != before
        };
        if removed {
            tracing::debug!("Page target {} closed", target_id);
            self.emit(DriverEvent::ContextClosed {
                id: ContextId::new(target_id),
            });
        }
    }

    async fn attach(&self, attached: AttachedToTarget) {
        let session = attached.session_id;
        let info = attached.target_info;
        if info.target_type != "page" {
            // Workers and iframes are resumed and otherwise ignored.
            let _ = self
                .connection
                .send("Runtime.runIfWaitingForDebugger", json!({}), Some(&session))
                .await;
            return;
        }

        let id = ContextId::new(&info.target_id);
        let opener = info.opener_id.map(ContextId::new);
        self.contexts.lock().push(CdpContext {
            id: id.clone(),
            session_id: session.clone(),
            opener: opener.clone(),
            url: info.url.clone(),
            load_state: None,
        });
        tracing::debug!("Attached to page target {} ({})", id, info.url);
        self.emit(DriverEvent::ContextOpened {
            id: id.clone(),
            opener,
            url: info.url,
        });

        for method in ["Page.enable", "Runtime.runIfWaitingForDebugger"] {
            if let Err(e) = self.connection.send(method, json!({}), Some(&session)).await {
                tracing::warn!("{} failed for {}: {}", method, id, e);
                return;
            }
        }

        // Events from before Page.enable were never sent, so report where
        // the document already is.
        let state = self
            .connection
            .send(
                "Runtime.evaluate",
                json!({"expression": scripts::PAGE_STATE, "returnByValue": true}),
                Some(&session),
            )
            .await
            .ok()
            .and_then(|r| {
                serde_json::from_value::<PageState>(r["result"]["value"]["value"].clone()).ok()
            });
        let Some(state) = state else {
            return;
        };
        let reached = match state.ready_state.as_str() {
            "complete" => Some(LoadState::Load),
            "interactive" => Some(LoadState::DomContentLoaded),
            _ => None,
        };
        let mut events = Vec::new();
        {
            let mut contexts = self.contexts.lock();
            let Some(ctx) = contexts.iter_mut().find(|c| c.session_id == session) else {
                return;
            };
            if ctx.url != state.url {
                ctx.url = state.url.clone();
                ctx.load_state = None;
                events.push(DriverEvent::Navigated {
                    id: id.clone(),
                    url: state.url,
                });
            }
            if reached > ctx.load_state {
                ctx.load_state = reached;
                if let Some(reached) = reached {
                    events.push(DriverEvent::LoadState {
                        id: id.clone(),
                        state: LoadState::DomContentLoaded,
                    });
                    if reached == LoadState::Load {
                        events.push(DriverEvent::LoadState {
                            id: id.clone(),
                            state: LoadState::Load,
                        });
                    }
                }
            }
        }
        for event in events {
            self.emit(event);
        }
    }

    async fn handle(&self, event: Event) {
        let session = event.session_id.as_deref().unwrap_or("");
        let params = event.params;
        match event.method.as_str() {
            "Target.attachedToTarget" => match serde_json::from_value::<AttachedToTarget>(params) {
                Ok(attached) => self.attach(attached).await,
                Err(e) => tracing::warn!("Malformed attachedToTarget: {}", e),
            },
            "Target.detachedFromTarget" => {
                if let Some(target_id) = params["targetId"].as_str() {
                    self.close(target_id);
                }
            }
            "Target.targetDestroyed" => {
                if let Some(target_id) = params["targetId"].as_str() {
                    self.close(target_id);
                }
            }
            "Page.frameNavigated" => {
                let frame = &params["frame"];
                if frame.get("parentId").is_some_and(|p| !p.is_null()) {
                    return;
                }
                let url = format!(
                    "{}{}",
                    frame["url"].as_str().unwrap_or_default(),
                    frame["urlFragment"].as_str().unwrap_or_default()
                );
                self.update(session, |ctx| {
                    ctx.url = url.clone();
                    ctx.load_state = None;
                    Some(DriverEvent::Navigated {
                        id: ctx.id.clone(),
                        url,
                    })
                });
            }
            "Page.navigatedWithinDocument" => {
                let frame_id = params["frameId"].as_str().unwrap_or_default();
                let url = params["url"].as_str().unwrap_or_default().to_string();
                self.update(session, |ctx| {
                    // The main frame shares its id with the page target.
                    if ctx.id.as_str() != frame_id {
                        return None;
                    }
                    ctx.url = url.clone();
                    Some(DriverEvent::Navigated {
                        id: ctx.id.clone(),
                        url,
                    })
                });
            }
            "Page.domContentEventFired" => self.update(session, |ctx| {
                ctx.load_state = ctx.load_state.max(Some(LoadState::DomContentLoaded));
                Some(DriverEvent::LoadState {
                    id: ctx.id.clone(),
                    state: LoadState::DomContentLoaded,
                })
            }),
            "Page.loadEventFired" => self.update(session, |ctx| {
                ctx.load_state = Some(LoadState::Load);
                Some(DriverEvent::LoadState {
                    id: ctx.id.clone(),
                    state: LoadState::Load,
                })
            }),
            _ => {}
        }
    }
}

async fn translate(shared: Arc<Shared>, mut events: broadcast::Receiver<Event>) {
    loop {
        match events.recv().await {
            Ok(event) => shared.handle(event).await,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("DevTools event translator lagged by {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::debug!("DevTools event translator stopped");
}

#[async_trait]
impl BrowserDriver for CdpDriver {
    fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.shared.events.subscribe()
    }

    async fn contexts(&self) -> Result<Vec<ContextInfo>> {
        Ok(self
            .shared
            .contexts
            .lock()
            .iter()
            .map(|c| ContextInfo {
                id: c.id.clone(),
                opener: c.opener.clone(),
                url: c.url.clone(),
                load_state: c.load_state,
            })
            .collect())
    }

    async fn open_context(&self, url: &str) -> Result<ContextId> {
        let mut events = self.subscribe();
        let response = self
            .shared
            .connection
            .send("Target.createTarget", json!({"url": url}), None)
            .await?;
        let id = response["targetId"]
            .as_str()
            .map(ContextId::new)
            .ok_or_else(|| {
                Error::ProtocolError("Target.createTarget response missing 'targetId'".to_string())
            })?;

        // The target is usable once auto-attach registered its session.
        let attached = async {
            while self.session(&id).is_none() {
                match events.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => return Err(Error::ChannelClosed),
                }
            }
            Ok(())
        };
        tokio::time::timeout(self.timeout, attached)
            .await
            .map_err(|_| Error::Timeout(format!("Page target {} was never attached", id)))??;
        Ok(id)
    }

    async fn close_context(&self, context: &ContextId) -> Result<()> {
        if self.session(context).is_none() {
            return Ok(());
        }
        match self
            .shared
            .connection
            .send("Target.closeTarget", json!({"targetId": context.as_str()}), None)
            .await
        {
            Ok(_) => {}
            Err(Error::ProtocolError(message)) if message.contains("No target with given id") => {}
            Err(e) => return Err(e),
        }
        self.shared.close(context.as_str());
        Ok(())
    }

    async fn goto(&self, context: &ContextId, url: &str) -> Result<()> {
        let Some(session) = self.session(context) else {
            return Err(Error::page_closed(format!("Context {context} is closed")));
        };
        let url = self.resolve_url(context, url);
        let response = self
            .shared
            .connection
            .send("Page.navigate", json!({"url": url}), Some(&session))
            .await?;
        if let Some(error_text) = response["errorText"].as_str() {
            return Err(Error::ProtocolError(format!(
                "Navigation to {} failed: {}",
                url, error_text
            )));
        }
        Ok(())
    }

    async fn url(&self, context: &ContextId) -> Result<String> {
        self.shared
            .contexts
            .lock()
            .iter()
            .find(|c| &c.id == context)
            .map(|c| c.url.clone())
            .ok_or_else(|| Error::page_closed(format!("Context {context} is closed")))
    }

    async fn query_all(
        &self,
        context: &ContextId,
        selector: &Selector,
    ) -> Result<Vec<ElementHandle>> {
        let Some(session) = self.session(context) else {
            return Ok(Vec::new());
        };
        if selector.is_empty() {
            return Ok(Vec::new());
        }
        let expression = scripts::query_expression(&steps_json(selector))?;
        let reply = match self.evaluate(&session, expression).await {
            Ok(reply) => reply,
            // Mid-navigation: nothing matches until the next document exists.
            Err(e) if is_context_gone(&e) => return Ok(Vec::new()),
            Err(Error::ProtocolError(message)) if message.contains("SyntaxError") => {
                return Err(Error::InvalidArgument(format!(
                    "Invalid selector '{}': {}",
                    selector, message
                )));
            }
            Err(e) => return Err(e),
        };
        let result: QueryResult = serde_json::from_value(reply["value"].clone())?;
        Ok(result
            .ids
            .into_iter()
            .map(|node| {
                ElementHandle::new(
                    context.clone(),
                    ElementRef {
                        document: result.doc,
                        node,
                    },
                )
            })
            .collect())
    }

    async fn element_state(&self, element: &ElementHandle) -> Result<ActionableState> {
        let value = self.call(element, ElementScript::State, Value::Null).await?;
        Ok(ActionableState {
            attached: value["attached"].as_bool().unwrap_or(false),
            visible: value["visible"].as_bool().unwrap_or(false),
            stable: value["stable"].as_bool().unwrap_or(false),
            enabled: value["enabled"].as_bool().unwrap_or(false),
            receives_events: value["receives_events"].as_bool().unwrap_or(false),
        })
    }

    async fn text_content(&self, element: &ElementHandle) -> Result<Option<String>> {
        let value = self.call(element, ElementScript::TextContent, Value::Null).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn inner_text(&self, element: &ElementHandle) -> Result<String> {
        let value = self.call(element, ElementScript::InnerText, Value::Null).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let value = self.call(element, ElementScript::Attribute, json!(name)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn input_value(&self, element: &ElementHandle) -> Result<String> {
        let value = self.call(element, ElementScript::InputValue, Value::Null).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let value = self.call(element, ElementScript::Center, Value::Null).await?;
        let point: Point = serde_json::from_value(value)?;
        let Some(session) = self.session(element.context()) else {
            return Err(Error::StaleElement(format!("{element}: context is closed")));
        };
        for kind in ["mouseMoved", "mousePressed", "mouseReleased"] {
            self.mouse(&session, kind, &point).await?;
        }
        tracing::debug!("Clicked {} at ({}, {})", element, point.x, point.y);
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let needs_input = self
            .call(element, ElementScript::PrepareFill, json!(text))
            .await?;
        if needs_input.as_bool() != Some(true) {
            return Ok(());
        }
        let Some(session) = self.session(element.context()) else {
            return Err(Error::StaleElement(format!("{element}: context is closed")));
        };
        self.shared
            .connection
            .send("Input.insertText", json!({"text": text}), Some(&session))
            .await
            .map(|_| ())
    }

    async fn select_options(
        &self,
        element: &ElementHandle,
        options: &[SelectOption],
    ) -> Result<Vec<String>> {
        let wanted = Value::Array(options.iter().map(SelectOption::to_json).collect());
        let value = self.call(element, ElementScript::SelectOptions, wanted).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_json_shapes() {
        let selector = Selector::parse(r#".inventory_item >> xpath=.. >> nth=-1"#);
        assert_eq!(
            steps_json(&selector),
            json!([{"css": ".inventory_item"}, {"parent": true}, {"nth": -1}])
        );
    }

    #[test]
    fn test_target_info_parses_opener() {
        let attached: AttachedToTarget = serde_json::from_value(json!({
            "sessionId": "S2",
            "targetInfo": {
                "targetId": "T2",
                "type": "page",
                "url": "about:blank",
                "openerId": "T1",
                "attached": true
            },
            "waitingForDebugger": true
        }))
        .unwrap();
        assert_eq!(attached.target_info.opener_id.as_deref(), Some("T1"));
        assert_eq!(attached.session_id, "S2");
    }
}
