// BrowserContext - root handle over a driven browser
//
// Owns the context registry: the engine's view of every browsing context
// (tab) the driver reported. A pump task applies driver events to the
// registry and only then re-broadcasts them, so a waiter woken by an event
// always finds the registry already updated.

use crate::api::{EngineOptions, deadline_after};
use crate::driver::{
    BrowserDriver, ContextId, ContextInfo, DriverEvent, EVENT_CHANNEL_CAPACITY, LoadState,
};
use crate::error::{Error, Result};
use crate::protocol::Page;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Lifecycle of a browsing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Reported by the driver, no document committed yet
    Opening,
    /// A document was committed
    Active,
    /// Closed explicitly or by the browser
    Closed,
}

#[derive(Debug, Clone)]
pub(crate) struct ContextRecord {
    pub(crate) id: ContextId,
    pub(crate) opener: Option<ContextId>,
    pub(crate) url: String,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) load_state: Option<LoadState>,
    pub(crate) navigations: u64,
}

/// Registry of every context seen during a session, closed ones included.
pub(crate) struct ContextRegistry {
    records: Mutex<Vec<ContextRecord>>,
    events: broadcast::Sender<DriverEvent>,
}

impl ContextRegistry {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            records: Mutex::new(Vec::new()),
            events,
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.events.subscribe()
    }

    pub(crate) fn get(&self, id: &ContextId) -> Option<ContextRecord> {
        self.records.lock().iter().find(|r| &r.id == id).cloned()
    }

    pub(crate) fn records(&self) -> Vec<ContextRecord> {
        self.records.lock().clone()
    }

    /// Applies one event, then re-broadcasts it.
    pub(crate) fn apply(&self, event: DriverEvent) {
        {
            let mut records = self.records.lock();
            let existing = records.iter().position(|r| &r.id == event.context());
            match (&event, existing) {
                (DriverEvent::ContextOpened { id, opener, url }, None) => {
                    tracing::debug!("Context {} opened (opener: {:?})", id, opener);
                    records.push(ContextRecord {
                        id: id.clone(),
                        opener: opener.clone(),
                        url: url.clone(),
                        lifecycle: Lifecycle::Opening,
                        load_state: None,
                        navigations: 0,
                    });
                }
                (DriverEvent::ContextOpened { .. }, Some(_)) => {}
                (_, Some(index)) if records[index].lifecycle == Lifecycle::Closed => {
                    tracing::debug!("Ignoring event for closed context: {:?}", event);
                }
                (DriverEvent::Navigated { url, .. }, Some(index)) => {
                    let record = &mut records[index];
                    tracing::debug!("Context {} navigated to {}", record.id, url);
                    record.url = url.clone();
                    record.load_state = None;
                    record.navigations += 1;
                    record.lifecycle = Lifecycle::Active;
                }
                (DriverEvent::LoadState { state, .. }, Some(index)) => {
                    let record = &mut records[index];
                    record.load_state = record.load_state.max(Some(*state));
                    record.lifecycle = Lifecycle::Active;
                }
                (DriverEvent::ContextClosed { id }, Some(index)) => {
                    tracing::debug!("Context {} closed", id);
                    records[index].lifecycle = Lifecycle::Closed;
                }
                (_, None) => {
                    tracing::warn!("Event for unknown context: {:?}", event);
                }
            }
        }
        let _ = self.events.send(event);
    }

    /// Reconciles the registry with a driver snapshot, emitting the events
    /// that were missed.
    pub(crate) fn sync(&self, infos: Vec<ContextInfo>) {
        let mut missed = Vec::new();
        {
            let records = self.records.lock();
            for info in &infos {
                let known = records.iter().find(|r| r.id == info.id);
                let load_state = match known {
                    None => {
                        missed.push(DriverEvent::ContextOpened {
                            id: info.id.clone(),
                            opener: info.opener.clone(),
                            url: info.url.clone(),
                        });
                        None
                    }
                    Some(record) if record.lifecycle == Lifecycle::Closed => continue,
                    Some(record) if record.url != info.url => {
                        missed.push(DriverEvent::Navigated {
                            id: info.id.clone(),
                            url: info.url.clone(),
                        });
                        None
                    }
                    Some(record) => record.load_state,
                };
                for state in [LoadState::DomContentLoaded, LoadState::Load] {
                    if Some(state) <= info.load_state && Some(state) > load_state {
                        missed.push(DriverEvent::LoadState {
                            id: info.id.clone(),
                            state,
                        });
                    }
                }
            }
            for record in records.iter() {
                if record.lifecycle != Lifecycle::Closed && !infos.iter().any(|i| i.id == record.id)
                {
                    missed.push(DriverEvent::ContextClosed {
                        id: record.id.clone(),
                    });
                }
            }
        }
        for event in missed {
            self.apply(event);
        }
    }

    /// Marks a context closed unless it already is.
    pub(crate) fn mark_closed(&self, id: &ContextId) {
        let open = self
            .get(id)
            .is_some_and(|record| record.lifecycle != Lifecycle::Closed);
        if open {
            self.apply(DriverEvent::ContextClosed { id: id.clone() });
        }
    }

    /// Re-runs `probe` on every registry change until it yields a value or
    /// the deadline passes. The subscription is armed before the first probe.
    pub(crate) async fn wait_for<T>(
        &self,
        deadline: Instant,
        mut probe: impl FnMut(&ContextRegistry) -> Option<T>,
    ) -> Option<T> {
        let mut events = self.subscribe();
        loop {
            if let Some(found) = probe(self) {
                return Some(found);
            }
            match tokio::time::timeout_at(deadline.into(), events.recv()).await {
                Ok(Ok(_)) | Ok(Err(RecvError::Lagged(_))) => {}
                Ok(Err(RecvError::Closed)) | Err(_) => return probe(self),
            }
        }
    }
}

async fn pump(
    driver: Arc<dyn BrowserDriver>,
    registry: Arc<ContextRegistry>,
    mut events: broadcast::Receiver<DriverEvent>,
) {
    loop {
        match events.recv().await {
            Ok(event) => registry.apply(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Registry lagged by {} driver events, resyncing", skipped);
                match driver.contexts().await {
                    Ok(infos) => registry.sync(infos),
                    Err(e) => tracing::warn!("Failed to resync contexts: {}", e),
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::debug!("Driver event stream ended");
}

struct ContextInner {
    driver: Arc<dyn BrowserDriver>,
    registry: Arc<ContextRegistry>,
    options: EngineOptions,
    pump: JoinHandle<()>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Root handle over a driven browser and the tabs it opens.
///
/// Cloning is cheap. The event pump stops when the last clone (including the
/// ones held by pages and locators) is dropped.
///
/// # Example
///
/// ```ignore
/// use autowait::{BrowserContext, expect};
///
/// # async fn example(driver: autowait::driver::memory::MemoryDriver) -> autowait::Result<()> {
/// let context = BrowserContext::new(driver).await?;
/// let page = context.new_page("https://www.saucedemo.com/inventory.html").await?;
///
/// // Arm, trigger, await: the new tab cannot be missed
/// let social = page.locator(r#"[data-test="social-linkedin"]"#);
/// let tab = context.expect_page(|| social.click(None)).await?;
/// tab.wait_for_load_state(None, None).await?;
/// tab.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BrowserContext {
    inner: Arc<ContextInner>,
}

impl BrowserContext {
    /// Wraps a driver with default [`EngineOptions`].
    pub async fn new(driver: impl BrowserDriver) -> Result<Self> {
        Self::with_options(driver, EngineOptions::default()).await
    }

    pub async fn with_options(driver: impl BrowserDriver, options: EngineOptions) -> Result<Self> {
        let driver: Arc<dyn BrowserDriver> = Arc::new(driver);
        let registry = Arc::new(ContextRegistry::new());

        // Subscribe before the snapshot; replayed events are idempotent.
        let events = driver.subscribe();
        registry.sync(driver.contexts().await?);
        let pump = tokio::spawn(pump(Arc::clone(&driver), Arc::clone(&registry), events));

        Ok(Self {
            inner: Arc::new(ContextInner {
                driver,
                registry,
                options,
                pump,
            }),
        })
    }

    pub fn options(&self) -> EngineOptions {
        self.inner.options
    }

    pub(crate) fn driver(&self) -> &dyn BrowserDriver {
        self.inner.driver.as_ref()
    }

    pub(crate) fn registry(&self) -> &ContextRegistry {
        &self.inner.registry
    }

    /// Open pages, in the order they appeared.
    pub fn pages(&self) -> Vec<Page> {
        self.registry()
            .records()
            .into_iter()
            .filter(|record| record.lifecycle != Lifecycle::Closed)
            .map(|record| Page::new(record.id, self.clone()))
            .collect()
    }

    /// Page for a context id the registry knows about.
    pub fn page(&self, id: &ContextId) -> Option<Page> {
        self.registry()
            .get(id)
            .map(|record| Page::new(record.id, self.clone()))
    }

    /// Opens a new tab and navigates it to `url`, waiting for the load event.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let timeout = self.options().navigation_timeout;
        let deadline = deadline_after(timeout);
        let id = self.driver().open_context("about:blank").await?;
        self.registry()
            .wait_for(deadline, |registry| registry.get(&id).map(|_| ()))
            .await
            .ok_or(Error::ContextWaitTimeout { timeout })?;

        let page = Page::new(id, self.clone());
        if url != "about:blank" {
            page.goto(url).await?;
        }
        Ok(page)
    }

    /// Runs `trigger` and returns the page it opened.
    ///
    /// The wait is armed before the trigger runs, so a tab that opens while
    /// the trigger is still in flight is never missed. Uses the context
    /// timeout from [`EngineOptions`].
    pub async fn expect_page<F, Fut, T>(&self, trigger: F) -> Result<Page>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.expect_page_with_timeout(self.options().context_timeout, trigger)
            .await
    }

    pub async fn expect_page_with_timeout<F, Fut, T>(
        &self,
        timeout: Duration,
        trigger: F,
    ) -> Result<Page>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.wait_for_page(timeout, None, trigger).await
    }

    /// Waits for a context that appears after this call.
    ///
    /// A tab opened before the call is not reported: call this before
    /// triggering, or use [`BrowserContext::expect_page`].
    pub async fn wait_for_new_context(&self, timeout: Option<Duration>) -> Result<Page> {
        let timeout = timeout.unwrap_or(self.options().context_timeout);
        self.wait_for_page(timeout, None, || async { Ok::<(), Error>(()) })
            .await
    }

    pub(crate) async fn wait_for_page<F, Fut, T>(
        &self,
        timeout: Duration,
        opener: Option<&ContextId>,
        trigger: F,
    ) -> Result<Page>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Arm: everything known now is not the page we are waiting for.
        let known: HashSet<ContextId> = self
            .registry()
            .records()
            .into_iter()
            .map(|record| record.id)
            .collect();
        let deadline = deadline_after(timeout);

        trigger().await?;

        let id = self
            .registry()
            .wait_for(deadline, |registry| {
                registry
                    .records()
                    .into_iter()
                    .find(|record| {
                        !known.contains(&record.id)
                            && opener.is_none_or(|opener| record.opener.as_ref() == Some(opener))
                    })
                    .map(|record| record.id)
            })
            .await
            .ok_or(Error::ContextWaitTimeout { timeout })?;
        tracing::debug!("New page {} appeared", id);
        Ok(Page::new(id, self.clone()))
    }

    /// Closes every open page.
    pub async fn close(&self) -> Result<()> {
        for page in self.pages() {
            page.close().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for BrowserContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserContext")
            .field("options", &self.inner.options)
            .field("contexts", &self.registry().records().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened(id: &str, opener: Option<&str>) -> DriverEvent {
        DriverEvent::ContextOpened {
            id: ContextId::new(id),
            opener: opener.map(ContextId::new),
            url: "about:blank".to_string(),
        }
    }

    #[test]
    fn test_lifecycle_transitions() {
        let registry = ContextRegistry::new();
        let id = ContextId::new("page-1");
        registry.apply(opened("page-1", None));
        assert_eq!(registry.get(&id).unwrap().lifecycle, Lifecycle::Opening);

        registry.apply(DriverEvent::Navigated {
            id: id.clone(),
            url: "https://www.saucedemo.com/".to_string(),
        });
        let record = registry.get(&id).unwrap();
        assert_eq!(record.lifecycle, Lifecycle::Active);
        assert_eq!(record.navigations, 1);
        assert_eq!(record.load_state, None);

        registry.apply(DriverEvent::LoadState {
            id: id.clone(),
            state: LoadState::Load,
        });
        registry.apply(DriverEvent::LoadState {
            id: id.clone(),
            state: LoadState::DomContentLoaded,
        });
        assert_eq!(registry.get(&id).unwrap().load_state, Some(LoadState::Load));

        registry.mark_closed(&id);
        registry.apply(DriverEvent::Navigated {
            id: id.clone(),
            url: "https://www.saucedemo.com/cart.html".to_string(),
        });
        let record = registry.get(&id).unwrap();
        assert_eq!(record.lifecycle, Lifecycle::Closed);
        assert_eq!(record.url, "https://www.saucedemo.com/");
    }

    #[test]
    fn test_sync_emits_missed_events() {
        let registry = ContextRegistry::new();
        registry.apply(opened("page-1", None));
        let mut events = registry.subscribe();

        registry.sync(vec![ContextInfo {
            id: ContextId::new("page-2"),
            opener: Some(ContextId::new("page-1")),
            url: "https://x.com/saucelabs".to_string(),
            load_state: Some(LoadState::Load),
        }]);

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen.len(), 4, "{seen:?}");
        assert!(matches!(seen[0], DriverEvent::ContextOpened { .. }));
        assert!(matches!(seen[3], DriverEvent::ContextClosed { .. }));
        assert_eq!(
            registry.get(&ContextId::new("page-1")).unwrap().lifecycle,
            Lifecycle::Closed
        );
        assert_eq!(
            registry.get(&ContextId::new("page-2")).unwrap().load_state,
            Some(LoadState::Load)
        );
    }

    #[tokio::test]
    async fn test_wait_for_sees_state_reached_before_arming() {
        let registry = ContextRegistry::new();
        registry.apply(opened("page-1", None));
        let found = registry
            .wait_for(Instant::now() + Duration::from_millis(50), |r| {
                r.get(&ContextId::new("page-1")).map(|record| record.lifecycle)
            })
            .await;
        assert_eq!(found, Some(Lifecycle::Opening));
    }

    #[tokio::test]
    async fn test_wait_for_gives_up_at_deadline() {
        let registry = ContextRegistry::new();
        let start = Instant::now();
        let found = registry
            .wait_for(start + Duration::from_millis(50), |r| {
                r.get(&ContextId::new("missing")).map(|_| ())
            })
            .await;
        assert!(found.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
