// Page - one browsing context (tab)
//
// A Page is a cheap handle: a context id plus the BrowserContext that owns
// the registry. Its URL and lifecycle are read from the registry, never
// from the driver, so they reflect every event the pump has applied.

use crate::api::{EngineOptions, deadline_after};
use crate::driver::{BrowserDriver, ContextId, LoadState};
use crate::error::{Error, Result};
use crate::protocol::browser_context::{ContextRegistry, Lifecycle};
use crate::protocol::navigation::NavigationTracker;
use crate::protocol::{
    BrowserContext, ClickOptions, FillOptions, Locator, SelectOption, SelectOptions, Selector,
    UrlPattern,
};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// A browsing context.
///
/// # Example
///
/// ```ignore
/// use autowait::{BrowserContext, expect_page};
///
/// # async fn example(context: BrowserContext) -> autowait::Result<()> {
/// let page = context.new_page("https://www.saucedemo.com/").await?;
/// page.fill(r#"[data-test="username"]"#, "standard_user", None).await?;
/// page.fill(r#"[data-test="password"]"#, "secret_sauce", None).await?;
/// page.click(r#"[data-test="login-button"]"#, None).await?;
/// page.wait_for_url("**/inventory.html", None).await?;
/// expect_page(&page).to_have_url("https://www.saucedemo.com/inventory.html").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Page {
    id: ContextId,
    context: BrowserContext,
}

impl Page {
    pub(crate) fn new(id: ContextId, context: BrowserContext) -> Self {
        Self { id, context }
    }

    pub fn id(&self) -> &ContextId {
        &self.id
    }

    /// The BrowserContext this page belongs to.
    pub fn context(&self) -> &BrowserContext {
        &self.context
    }

    pub fn options(&self) -> EngineOptions {
        self.context.options()
    }

    pub(crate) fn driver(&self) -> &dyn BrowserDriver {
        self.context.driver()
    }

    fn registry(&self) -> &ContextRegistry {
        self.context.registry()
    }

    fn navigation(&self) -> NavigationTracker<'_> {
        NavigationTracker::new(self.registry(), &self.id)
    }

    /// Current URL as last reported by the browser.
    ///
    /// A closed page keeps reporting its final URL.
    pub fn url(&self) -> String {
        self.registry()
            .get(&self.id)
            .map(|record| record.url)
            .unwrap_or_default()
    }

    /// Id of the page that opened this one, if any.
    pub fn opener(&self) -> Option<ContextId> {
        self.registry().get(&self.id).and_then(|record| record.opener)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.registry()
            .get(&self.id)
            .map_or(Lifecycle::Opening, |record| record.lifecycle)
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle() == Lifecycle::Closed
    }

    /// Fails with `TargetClosed` once the page is closed.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::page_closed(format!("Page {} is closed", self.id)));
        }
        Ok(())
    }

    /// Creates a locator. Nothing is resolved until the locator is used.
    pub fn locator(&self, selector: &str) -> Locator {
        Locator::new(self.clone(), Selector::parse(selector))
    }

    /// Navigates to `url` and waits for the load event.
    ///
    /// Relative URLs resolve against the current one.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        let timeout = self.options().navigation_timeout;
        let deadline = deadline_after(timeout);
        let navigation = self.navigation();

        let before = navigation.navigation_count();
        self.driver().goto(&self.id, url).await?;
        navigation
            .wait_for_navigation(before, url, deadline, timeout)
            .await?;
        navigation
            .wait_for_load_state(LoadState::Load, deadline, timeout)
            .await
    }

    /// Waits until the URL matches `pattern`.
    ///
    /// Returns immediately when the page is already there.
    pub async fn wait_for_url(
        &self,
        pattern: impl Into<UrlPattern>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let timeout = timeout.unwrap_or(self.options().navigation_timeout);
        self.navigation()
            .wait_for_url(&pattern.into(), timeout)
            .await
    }

    /// Waits until the current document reached `state` (default: `Load`).
    pub async fn wait_for_load_state(
        &self,
        state: Option<LoadState>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let timeout = timeout.unwrap_or(self.options().navigation_timeout);
        self.navigation()
            .wait_for_load_state(state.unwrap_or_default(), deadline_after(timeout), timeout)
            .await
    }

    /// Runs `trigger` and returns the popup this page opened because of it.
    pub async fn expect_popup<F, Fut, T>(&self, trigger: F) -> Result<Page>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.context
            .wait_for_page(self.options().context_timeout, Some(&self.id), trigger)
            .await
    }

    /// Shortcut for `page.locator(selector).click(options)`.
    pub async fn click(&self, selector: &str, options: Option<ClickOptions>) -> Result<()> {
        self.locator(selector).click(options).await
    }

    /// Shortcut for `page.locator(selector).fill(text, options)`.
    pub async fn fill(
        &self,
        selector: &str,
        text: &str,
        options: Option<FillOptions>,
    ) -> Result<()> {
        self.locator(selector).fill(text, options).await
    }

    /// Shortcut for `page.locator(selector).select_option(value, options)`.
    pub async fn select_option(
        &self,
        selector: &str,
        value: impl Into<SelectOption>,
        options: Option<SelectOptions>,
    ) -> Result<Vec<String>> {
        self.locator(selector).select_option(value, options).await
    }

    /// Closes the page. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.driver().close_context(&self.id).await?;
        self.registry().mark_closed(&self.id);
        Ok(())
    }
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Page {}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("url", &self.url())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}
