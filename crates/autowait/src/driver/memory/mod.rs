//! In-memory browser backend
//!
//! `MemoryDriver` hosts any number of browsing contexts, each holding one
//! [`Document`] rendered by a [`Site`]. Page behaviour is scripted through
//! click and change handlers on [`NodeSpec`]s. Navigations can be delayed so
//! that tests observe the same asynchrony a real browser shows.

mod css;
mod dom;

pub use dom::{Document, Handler, NodeSpec, Scope, element};

use crate::driver::{
    ActionableState, BrowserDriver, ContextId, ContextInfo, DriverEvent, ElementHandle,
    ElementRef, EVENT_CHANNEL_CAPACITY, LoadState,
};
use crate::error::{Error, Result};
use crate::protocol::{SelectOption, Selector};
use async_trait::async_trait;
use dom::{Effect, NodeId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// URL of the empty document every new context starts on.
pub const ABOUT_BLANK: &str = "about:blank";

/// Renders the document for a URL.
///
/// Called with the driver's state locked, so implementations must not call
/// back into the driver. Sites that keep their own state lock it *after*
/// the driver, never the other way round.
pub trait Site: Send + Sync + 'static {
    fn render(&self, url: &str) -> NodeSpec;
}

type PageFactory = Arc<dyn Fn() -> NodeSpec + Send + Sync>;

/// A site made of fixed pages, keyed by exact URL.
///
/// Unknown URLs render a bare "404 Not Found" document.
#[derive(Clone, Default)]
pub struct StaticSite {
    pages: HashMap<String, PageFactory>,
}

impl StaticSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the page served at `url`.
    pub fn page(
        mut self,
        url: impl Into<String>,
        factory: impl Fn() -> NodeSpec + Send + Sync + 'static,
    ) -> Self {
        self.pages.insert(url.into(), Arc::new(factory));
        self
    }
}

impl Site for StaticSite {
    fn render(&self, url: &str) -> NodeSpec {
        match self.pages.get(url) {
            Some(factory) => factory(),
            None if url == ABOUT_BLANK => element("body"),
            None => element("body").child(element("h1").text("404 Not Found")),
        }
    }
}

struct MemoryContext {
    id: ContextId,
    opener: Option<ContextId>,
    url: String,
    document: Document,
    load_state: Option<LoadState>,
    // Bumped on every navigation start; a commit only lands if it still matches.
    navigation: u64,
}

#[derive(Default)]
struct MemoryState {
    contexts: Vec<MemoryContext>,
    next_context: u64,
    next_document: u64,
}

impl MemoryState {
    fn context(&self, id: &ContextId) -> Option<&MemoryContext> {
        self.contexts.iter().find(|c| &c.id == id)
    }

    fn context_mut(&mut self, id: &ContextId) -> Option<&mut MemoryContext> {
        self.contexts.iter_mut().find(|c| &c.id == id)
    }

    fn next_generation(&mut self) -> u64 {
        self.next_document += 1;
        self.next_document
    }

    // Context and node behind a handle, or StaleElement.
    fn element_mut(&mut self, element: &ElementHandle) -> Result<(&mut MemoryContext, NodeId)> {
        let Some(context) = self.context_mut(element.context()) else {
            return Err(Error::StaleElement(format!("{element}: context is closed")));
        };
        let ElementRef { document, node } = element.element();
        if context.document.generation() != document {
            return Err(Error::StaleElement(format!(
                "{element}: document was replaced"
            )));
        }
        if !context.document.contains(node) {
            return Err(Error::StaleElement(format!(
                "{element}: node is detached"
            )));
        }
        Ok((context, node))
    }
}

struct MemoryInner {
    site: Arc<dyn Site>,
    state: Mutex<MemoryState>,
    events: broadcast::Sender<DriverEvent>,
    navigation_delay: Duration,
}

/// Builder for [`MemoryDriver`].
pub struct MemoryDriverBuilder {
    site: Arc<dyn Site>,
    navigation_delay: Duration,
}

impl MemoryDriverBuilder {
    /// Delay between a navigation starting and its commit.
    ///
    /// Defaults to zero (commit before `goto` or `click` returns).
    pub fn navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = delay;
        self
    }

    pub fn build(self) -> MemoryDriver {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        MemoryDriver {
            inner: Arc::new(MemoryInner {
                site: self.site,
                state: Mutex::new(MemoryState::default()),
                events,
                navigation_delay: self.navigation_delay,
            }),
        }
    }
}

/// Deterministic in-memory browser.
///
/// Cloning is cheap; clones share the same contexts.
///
/// # Example
///
/// ```ignore
/// use autowait::driver::memory::{MemoryDriver, StaticSite, element};
///
/// let site = StaticSite::new().page("https://shop.test/", || {
///     element("body").child(element("h1").text("Welcome"))
/// });
/// let driver = MemoryDriver::new(site);
/// ```
#[derive(Clone)]
pub struct MemoryDriver {
    inner: Arc<MemoryInner>,
}

impl MemoryDriver {
    pub fn new(site: impl Site) -> Self {
        Self::builder(site).build()
    }

    pub fn builder(site: impl Site) -> MemoryDriverBuilder {
        MemoryDriverBuilder {
            site: Arc::new(site),
            navigation_delay: Duration::ZERO,
        }
    }

    /// Driver serving a single page at `url`.
    pub fn single_page(
        url: &str,
        factory: impl Fn() -> NodeSpec + Send + Sync + 'static,
    ) -> Self {
        Self::new(StaticSite::new().page(url, factory))
    }

    /// Runs a script against a context's current document, as if a timer
    /// in the page fired. Effects requested by the script are applied
    /// before this returns.
    pub fn update(&self, context: &ContextId, script: impl FnOnce(&mut Scope<'_>)) -> Result<()> {
        let effects = {
            let mut state = self.inner.state.lock();
            let Some(ctx) = state.context_mut(context) else {
                return Err(Error::page_closed(format!("Context {context} is closed")));
            };
            let mut scope = Scope::new(&ctx.id, &ctx.url, &mut ctx.document, None);
            script(&mut scope);
            scope.into_effects()
        };
        self.inner.apply_effects(context, effects);
        Ok(())
    }
}

impl MemoryInner {
    fn emit(&self, event: DriverEvent) {
        // No receivers is fine: nobody is watching this driver yet.
        let _ = self.events.send(event);
    }

    fn open(self: &Arc<Self>, opener: Option<ContextId>, url: String) -> ContextId {
        let id = {
            let mut state = self.state.lock();
            state.next_context += 1;
            let id = ContextId::new(format!("page-{}", state.next_context));
            let generation = state.next_generation();
            state.contexts.push(MemoryContext {
                id: id.clone(),
                opener: opener.clone(),
                url: ABOUT_BLANK.to_string(),
                document: Document::blank(generation),
                load_state: None,
                navigation: 0,
            });
            self.emit(DriverEvent::ContextOpened {
                id: id.clone(),
                opener,
                url: ABOUT_BLANK.to_string(),
            });
            id
        };
        tracing::debug!("Opened memory context {}", id);

        if url == ABOUT_BLANK {
            let mut state = self.state.lock();
            if let Some(ctx) = state.context_mut(&id) {
                ctx.load_state = Some(LoadState::Load);
                self.emit(DriverEvent::LoadState {
                    id: id.clone(),
                    state: LoadState::DomContentLoaded,
                });
                self.emit(DriverEvent::LoadState {
                    id: id.clone(),
                    state: LoadState::Load,
                });
            }
        } else {
            self.navigate(&id, url);
        }
        id
    }

    fn navigate(self: &Arc<Self>, id: &ContextId, url: String) {
        let sequence = {
            let mut state = self.state.lock();
            let Some(ctx) = state.context_mut(id) else {
                return;
            };
            ctx.navigation += 1;
            ctx.navigation
        };
        tracing::debug!("Navigation {} of {} started: {}", sequence, id, url);

        let delay = self.navigation_delay;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) if !delay.is_zero() => {
                let inner = Arc::clone(self);
                let id = id.clone();
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    inner.commit(&id, sequence, url);
                });
            }
            _ => self.commit(id, sequence, url),
        }
    }

    fn commit(&self, id: &ContextId, sequence: u64, url: String) {
        let mut state = self.state.lock();
        let generation = state.next_generation();
        let Some(ctx) = state.context_mut(id) else {
            tracing::debug!("Dropping navigation of closed context {}", id);
            return;
        };
        if ctx.navigation != sequence {
            tracing::debug!("Navigation {} of {} was superseded", sequence, id);
            return;
        }
        let spec = self.site.render(&url);
        ctx.document = Document::new(generation, spec);
        ctx.url = url.clone();
        ctx.load_state = Some(LoadState::Load);
        tracing::debug!("Navigation committed in {}: {}", id, url);

        // Sent under the lock so event order always matches state order.
        self.emit(DriverEvent::Navigated {
            id: id.clone(),
            url,
        });
        self.emit(DriverEvent::LoadState {
            id: id.clone(),
            state: LoadState::DomContentLoaded,
        });
        self.emit(DriverEvent::LoadState {
            id: id.clone(),
            state: LoadState::Load,
        });
    }

    fn rerender(&self, id: &ContextId) {
        let mut state = self.state.lock();
        let generation = state.next_generation();
        if let Some(ctx) = state.context_mut(id) {
            let spec = self.site.render(&ctx.url);
            ctx.document = Document::new(generation, spec);
        }
    }

    fn schedule(self: &Arc<Self>, id: &ContextId, delay: Duration, handler: Handler) {
        let Some(generation) = self
            .state
            .lock()
            .context(id)
            .map(|ctx| ctx.document.generation())
        else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("Page timer dropped: no async runtime");
            return;
        };
        let inner = Arc::clone(self);
        let id = id.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let effects = {
                let mut state = inner.state.lock();
                let Some(ctx) = state.context_mut(&id) else {
                    return;
                };
                // Timers die with the document that set them.
                if ctx.document.generation() != generation {
                    return;
                }
                let mut scope = Scope::new(&ctx.id, &ctx.url, &mut ctx.document, None);
                handler(&mut scope);
                scope.into_effects()
            };
            inner.apply_effects(&id, effects);
        });
    }

    fn resolve_url(&self, id: &ContextId, href: &str) -> String {
        let base = self.state.lock().context(id).map(|ctx| ctx.url.clone());
        base.and_then(|base| url::Url::parse(&base).ok())
            .and_then(|base| base.join(href).ok())
            .map(String::from)
            .unwrap_or_else(|| href.to_string())
    }

    fn apply_effects(self: &Arc<Self>, id: &ContextId, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Rerender => self.rerender(id),
                Effect::Navigate(url) => {
                    let url = self.resolve_url(id, &url);
                    self.navigate(id, url);
                }
                Effect::OpenContext(url) => {
                    let url = self.resolve_url(id, &url);
                    self.open(Some(id.clone()), url);
                }
                Effect::After(delay, handler) => self.schedule(id, delay, handler),
            }
        }
    }
}

#[async_trait]
impl BrowserDriver for MemoryDriver {
    fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.inner.events.subscribe()
    }

    async fn contexts(&self) -> Result<Vec<ContextInfo>> {
        let state = self.inner.state.lock();
        Ok(state
            .contexts
            .iter()
            .map(|ctx| ContextInfo {
                id: ctx.id.clone(),
                opener: ctx.opener.clone(),
                url: ctx.url.clone(),
                load_state: ctx.load_state,
            })
            .collect())
    }

    async fn open_context(&self, url: &str) -> Result<ContextId> {
        Ok(self.inner.open(None, url.to_string()))
    }

    async fn close_context(&self, context: &ContextId) -> Result<()> {
        let mut state = self.inner.state.lock();
        let before = state.contexts.len();
        state.contexts.retain(|ctx| &ctx.id != context);
        if state.contexts.len() != before {
            tracing::debug!("Closed memory context {}", context);
            self.inner.emit(DriverEvent::ContextClosed {
                id: context.clone(),
            });
        }
        Ok(())
    }

    async fn goto(&self, context: &ContextId, url: &str) -> Result<()> {
        if self.inner.state.lock().context(context).is_none() {
            return Err(Error::page_closed(format!("Context {context} is closed")));
        }
        let url = self.inner.resolve_url(context, url);
        self.inner.navigate(context, url);
        Ok(())
    }

    async fn url(&self, context: &ContextId) -> Result<String> {
        self.inner
            .state
            .lock()
            .context(context)
            .map(|ctx| ctx.url.clone())
            .ok_or_else(|| Error::page_closed(format!("Context {context} is closed")))
    }

    async fn query_all(
        &self,
        context: &ContextId,
        selector: &Selector,
    ) -> Result<Vec<ElementHandle>> {
        let state = self.inner.state.lock();
        let Some(ctx) = state.context(context) else {
            return Ok(Vec::new());
        };
        let document = ctx.document.generation();
        Ok(ctx
            .document
            .resolve(selector)?
            .into_iter()
            .map(|node| ElementHandle::new(context.clone(), ElementRef { document, node }))
            .collect())
    }

    async fn element_state(&self, element: &ElementHandle) -> Result<ActionableState> {
        let mut state = self.inner.state.lock();
        let (ctx, node) = state.element_mut(element)?;
        Ok(ctx.document.state(node))
    }

    async fn text_content(&self, element: &ElementHandle) -> Result<Option<String>> {
        let mut state = self.inner.state.lock();
        let (ctx, node) = state.element_mut(element)?;
        Ok(Some(ctx.document.text_content(node)))
    }

    async fn inner_text(&self, element: &ElementHandle) -> Result<String> {
        let mut state = self.inner.state.lock();
        let (ctx, node) = state.element_mut(element)?;
        Ok(ctx.document.inner_text(node))
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let mut state = self.inner.state.lock();
        let (ctx, node) = state.element_mut(element)?;
        Ok(ctx.document.attribute_of(node, name).map(str::to_string))
    }

    async fn input_value(&self, element: &ElementHandle) -> Result<String> {
        let mut state = self.inner.state.lock();
        let (ctx, node) = state.element_mut(element)?;
        match ctx.document.tag_of(node) {
            Some("input" | "textarea" | "select") => {
                Ok(ctx.document.value_of(node).unwrap_or_default().to_string())
            }
            _ => Err(Error::InvalidArgument(
                "Node is not an <input>, <textarea> or <select> element".to_string(),
            )),
        }
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let effects = {
            let mut state = self.inner.state.lock();
            let (ctx, node) = state.element_mut(element)?;
            let handlers = ctx.document.click_handlers(node);
            if handlers.is_empty() {
                match ctx.document.enclosing_link(node) {
                    Some((href, true)) => vec![Effect::OpenContext(href)],
                    Some((href, false)) => vec![Effect::Navigate(href)],
                    None => Vec::new(),
                }
            } else {
                let mut scope = Scope::new(&ctx.id, &ctx.url, &mut ctx.document, Some(node));
                for handler in handlers {
                    handler(&mut scope);
                }
                scope.into_effects()
            }
        };
        tracing::debug!("Clicked {}", element);
        self.inner.apply_effects(element.context(), effects);
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let effects = {
            let mut state = self.inner.state.lock();
            let (ctx, node) = state.element_mut(element)?;
            let editable = matches!(ctx.document.tag_of(node), Some("input" | "textarea"))
                || ctx
                    .document
                    .attribute_of(node, "contenteditable")
                    .is_some_and(|v| v != "false");
            if !editable {
                return Err(Error::InvalidArgument(
                    "Element is not an <input>, <textarea> or [contenteditable] element"
                        .to_string(),
                ));
            }
            ctx.document.set_value(node, text.to_string());
            match ctx.document.change_handler(node) {
                Some(handler) => {
                    let mut scope =
                        Scope::new(&ctx.id, &ctx.url, &mut ctx.document, Some(node));
                    handler(&mut scope);
                    scope.into_effects()
                }
                None => Vec::new(),
            }
        };
        self.inner.apply_effects(element.context(), effects);
        Ok(())
    }

    async fn select_options(
        &self,
        element: &ElementHandle,
        options: &[SelectOption],
    ) -> Result<Vec<String>> {
        let (selected, effects) = {
            let mut state = self.inner.state.lock();
            let (ctx, node) = state.element_mut(element)?;
            if ctx.document.tag_of(node) != Some("select") {
                return Err(Error::InvalidArgument(
                    "Element is not a <select> element".to_string(),
                ));
            }
            let multiple = ctx.document.attribute_of(node, "multiple").is_some();
            if options.len() > 1 && !multiple {
                return Err(Error::InvalidArgument(
                    "Cannot select multiple options on a single <select>".to_string(),
                ));
            }
            let available = ctx.document.options_of(node);
            let mut selected = Vec::with_capacity(options.len());
            for option in options {
                let Some((_, value, _)) = available
                    .iter()
                    .find(|(index, value, label)| option.matches(*index, value, label))
                else {
                    return Err(Error::InvalidArgument(format!(
                        "No option matching {option:?}"
                    )));
                };
                selected.push(value.clone());
            }
            if let Some(first) = selected.first() {
                ctx.document.set_value(node, first.clone());
            }
            let effects = match ctx.document.change_handler(node) {
                Some(handler) => {
                    let mut scope =
                        Scope::new(&ctx.id, &ctx.url, &mut ctx.document, Some(node));
                    handler(&mut scope);
                    scope.into_effects()
                }
                None => Vec::new(),
            };
            (selected, effects)
        };
        self.inner.apply_effects(element.context(), effects);
        Ok(selected)
    }
}
