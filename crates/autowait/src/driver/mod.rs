//! Driven-browser capability interface
//!
//! The engine never talks to a browser directly. Everything it needs from the
//! browser process (element queries, input dispatch, navigation and
//! context lifecycle events) goes through [`BrowserDriver`].
//!
//! Two backends ship with the crate:
//! - [`memory::MemoryDriver`]: deterministic in-memory documents with
//!   scriptable behaviour, used for tests and simulations
//! - [`cdp::CdpDriver`]: Chrome DevTools Protocol over WebSocket

use crate::error::Result;
use crate::protocol::{SelectOption, Selector};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

pub mod cdp;
pub mod memory;

/// Capacity of driver event channels.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Identifier of a browsing context (tab or window).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(Arc<str>);

impl ContextId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ephemeral reference to one element, produced by resolving a locator.
///
/// A handle is only meaningful until the next await point: the node may
/// detach or the document may be replaced at any time, after which every
/// operation on the handle fails with [`Error::StaleElement`](crate::Error::StaleElement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef {
    /// Document generation the node was found in
    pub document: u64,
    /// Backend node identifier within that document
    pub node: u64,
}

/// An [`ElementRef`] bound to the context it was resolved in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    context: ContextId,
    element: ElementRef,
}

impl ElementHandle {
    pub fn new(context: ContextId, element: ElementRef) -> Self {
        Self { context, element }
    }

    pub fn context(&self) -> &ContextId {
        &self.context
    }

    pub fn element(&self) -> ElementRef {
        self.element
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {} of document {} in context {}",
            self.element.node, self.element.document, self.context
        )
    }
}

/// Actionability flags of an element, computed fresh on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionableState {
    /// Element is connected to the current document
    pub attached: bool,
    /// Element and all its ancestors are rendered
    pub visible: bool,
    /// Element is not mid-animation
    pub stable: bool,
    /// Element is not disabled
    pub enabled: bool,
    /// Element is the hit target at its own centre point
    pub receives_events: bool,
}

impl ActionableState {
    /// Returns true when every flag holds.
    pub fn is_actionable(&self) -> bool {
        self.attached && self.visible && self.stable && self.enabled && self.receives_events
    }

    /// State reported for an element that is no longer in the document.
    pub fn detached() -> Self {
        Self::default()
    }
}

impl fmt::Display for ActionableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attached={} visible={} stable={} enabled={} receives_events={}",
            self.attached, self.visible, self.stable, self.enabled, self.receives_events
        )
    }
}

/// Page load milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LoadState {
    /// `DOMContentLoaded` fired
    DomContentLoaded,
    /// `load` fired
    #[default]
    Load,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::DomContentLoaded => f.write_str("domcontentloaded"),
            LoadState::Load => f.write_str("load"),
        }
    }
}

/// Snapshot of one browsing context as the driver sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    pub id: ContextId,
    pub opener: Option<ContextId>,
    pub url: String,
    /// Highest load milestone reached by the current document
    pub load_state: Option<LoadState>,
}

/// Asynchronous notifications from the driven browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// A new tab or window appeared
    ContextOpened {
        id: ContextId,
        opener: Option<ContextId>,
        url: String,
    },
    /// The main frame committed a navigation (including same-document ones)
    Navigated { id: ContextId, url: String },
    /// The current document reached a load milestone
    LoadState { id: ContextId, state: LoadState },
    /// The context was closed
    ContextClosed { id: ContextId },
}

impl DriverEvent {
    pub fn context(&self) -> &ContextId {
        match self {
            DriverEvent::ContextOpened { id, .. }
            | DriverEvent::Navigated { id, .. }
            | DriverEvent::LoadState { id, .. }
            | DriverEvent::ContextClosed { id } => id,
        }
    }
}

/// Everything the engine needs from a driven browser process.
///
/// Queries against a closed or unknown context return an empty sequence.
/// Element operations on a detached node fail with `StaleElement`.
/// Input methods deliver exactly one input sequence per call; they do not
/// check actionability, that is the dispatcher's job.
#[async_trait]
pub trait BrowserDriver: Send + Sync + 'static {
    /// Subscribe to driver events. Events sent before the call are not replayed.
    fn subscribe(&self) -> broadcast::Receiver<DriverEvent>;

    /// Lists the open browsing contexts.
    async fn contexts(&self) -> Result<Vec<ContextInfo>>;

    /// Opens a new top-level context and starts navigating it to `url`.
    async fn open_context(&self, url: &str) -> Result<ContextId>;

    /// Closes a context. Closing an unknown or closed context is a no-op.
    async fn close_context(&self, context: &ContextId) -> Result<()>;

    /// Starts a navigation of the context's main frame.
    async fn goto(&self, context: &ContextId, url: &str) -> Result<()>;

    /// Returns the context's current URL.
    async fn url(&self, context: &ContextId) -> Result<String>;

    /// Resolves a selector chain to the elements matching right now.
    async fn query_all(&self, context: &ContextId, selector: &Selector)
    -> Result<Vec<ElementHandle>>;

    /// Computes the element's actionability flags.
    async fn element_state(&self, element: &ElementHandle) -> Result<ActionableState>;

    async fn text_content(&self, element: &ElementHandle) -> Result<Option<String>>;

    async fn inner_text(&self, element: &ElementHandle) -> Result<String>;

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    async fn input_value(&self, element: &ElementHandle) -> Result<String>;

    /// Delivers one primary-button click at the element's centre.
    async fn click(&self, element: &ElementHandle) -> Result<()>;

    /// Replaces the value of an input, textarea or contenteditable element.
    async fn fill(&self, element: &ElementHandle, text: &str) -> Result<()>;

    /// Selects options of a `<select>` element, returning the selected values.
    async fn select_options(
        &self,
        element: &ElementHandle,
        options: &[SelectOption],
    ) -> Result<Vec<String>>;
}
