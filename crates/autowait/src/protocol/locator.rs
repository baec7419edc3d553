// Locator - lazy element descriptor
//
// A Locator is a selector chain bound to a page. It holds no element
// references: every read and every action resolves it again, so it keeps
// working while the page re-renders underneath it.
//
// Key characteristics:
// - Lazy: nothing is queried until a read or action
// - Chainable: first(), last(), nth(), locator() and parent() build new locators
// - Strict: single-element reads and actions require exactly one match

use crate::driver::ElementHandle;
use crate::error::{Error, Result};
use crate::protocol::actions::{self, Action, ActionOutcome, DispatchOptions};
use crate::protocol::{
    ClickOptions, FillOptions, Page, SelectOption, SelectOptions, Selector, SelectorStep,
};
use std::fmt;

/// Attempts made by snapshot reads when elements detach mid-read.
const SNAPSHOT_ATTEMPTS: usize = 3;

/// Locator represents a way to find element(s) on the page at any given moment.
///
/// # Example
///
/// ```ignore
/// use autowait::Page;
///
/// # async fn example(page: Page) -> autowait::Result<()> {
/// // Chained relations: the row holding a product name
/// let row = page
///     .locator(r#"[data-test="inventory-item-name"]"#)
///     .first()
///     .parent();
/// row.locator("button").click(None).await?;
///
/// // Snapshot of every price, no retry
/// let prices = page
///     .locator(r#"[data-test="inventory-item-price"]"#)
///     .all_inner_texts()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Locator {
    page: Page,
    selector: Selector,
}

impl Locator {
    pub(crate) fn new(page: Page, selector: Selector) -> Self {
        Self { page, selector }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    fn with_step(&self, step: SelectorStep) -> Locator {
        Locator::new(self.page.clone(), self.selector.with_step(step))
    }

    /// Creates a locator for the first matching element.
    pub fn first(&self) -> Locator {
        self.nth(0)
    }

    /// Creates a locator for the last matching element.
    pub fn last(&self) -> Locator {
        self.nth(-1)
    }

    /// Creates a locator for the nth matching element (0-indexed, negative
    /// counts from the end).
    pub fn nth(&self, index: i32) -> Locator {
        self.with_step(SelectorStep::Nth(index))
    }

    /// Creates a sub-locator within this locator's subtree.
    pub fn locator(&self, selector: &str) -> Locator {
        Locator::new(
            self.page.clone(),
            self.selector.join(&Selector::parse(selector)),
        )
    }

    /// Creates a locator for the parent element(s), same as
    /// `locator("xpath=..")`.
    pub fn parent(&self) -> Locator {
        self.with_step(SelectorStep::Parent)
    }

    /// Resolves to the elements matching right now.
    ///
    /// A closed page, or one the browser already tore down, resolves to
    /// nothing.
    pub async fn resolve(&self) -> Result<Vec<ElementHandle>> {
        if self.page.is_closed() {
            return Ok(Vec::new());
        }
        match self
            .page
            .driver()
            .query_all(self.page.id(), &self.selector)
            .await
        {
            Err(Error::TargetClosed { .. }) => Ok(Vec::new()),
            result => result,
        }
    }

    async fn single(&self) -> Result<ElementHandle> {
        let mut handles = self.resolve().await?;
        if handles.len() != 1 {
            return Err(Error::AmbiguousMatch {
                selector: self.selector.to_string(),
                count: handles.len(),
            });
        }
        Ok(handles.remove(0))
    }

    /// Returns the number of elements matching this locator.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.resolve().await?.len())
    }

    /// Returns the text content of the element.
    pub async fn text_content(&self) -> Result<Option<String>> {
        let handle = self.single().await?;
        self.page.driver().text_content(&handle).await
    }

    /// Returns the rendered text of the element.
    pub async fn inner_text(&self) -> Result<String> {
        let handle = self.single().await?;
        self.page.driver().inner_text(&handle).await
    }

    pub async fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        let handle = self.single().await?;
        self.page.driver().attribute(&handle, name).await
    }

    /// Returns the value of an input, textarea or select element.
    pub async fn input_value(&self) -> Result<String> {
        let handle = self.single().await?;
        self.page.driver().input_value(&handle).await
    }

    /// Returns whether the element is visible. No match is not visible.
    pub async fn is_visible(&self) -> Result<bool> {
        let handles = self.resolve().await?;
        match handles.as_slice() {
            [] => Ok(false),
            [handle] => match self.page.driver().element_state(handle).await {
                Ok(state) => Ok(state.visible),
                Err(Error::StaleElement(_)) => Ok(false),
                Err(e) => Err(e),
            },
            many => Err(Error::AmbiguousMatch {
                selector: self.selector.to_string(),
                count: many.len(),
            }),
        }
    }

    pub async fn is_enabled(&self) -> Result<bool> {
        let handle = self.single().await?;
        Ok(self.page.driver().element_state(&handle).await?.enabled)
    }

    /// Rendered text of every match, in document order. No retry.
    pub async fn all_inner_texts(&self) -> Result<Vec<String>> {
        self.snapshot(false).await
    }

    /// Text content of every match, in document order. No retry.
    pub async fn all_text_contents(&self) -> Result<Vec<String>> {
        self.snapshot(true).await
    }

    // Reads every match in one pass; starts over if a node detaches mid-read.
    async fn snapshot(&self, text_content: bool) -> Result<Vec<String>> {
        let driver = self.page.driver();
        let mut attempt = 1;
        'resolve: loop {
            let handles = self.resolve().await?;
            let mut values = Vec::with_capacity(handles.len());
            for handle in &handles {
                let value = if text_content {
                    driver
                        .text_content(handle)
                        .await
                        .map(Option::unwrap_or_default)
                } else {
                    driver.inner_text(handle).await
                };
                match value {
                    Ok(value) => values.push(value),
                    Err(Error::StaleElement(_)) if attempt < SNAPSHOT_ATTEMPTS => {
                        attempt += 1;
                        continue 'resolve;
                    }
                    Err(e) => return Err(e),
                }
            }
            return Ok(values);
        }
    }

    // Action methods

    /// Runs the action dispatcher directly.
    pub async fn perform(&self, action: Action, options: DispatchOptions) -> Result<ActionOutcome> {
        actions::perform(self, &action, options)
            .await
            .map_err(|e| self.wrap_error_with_selector(e))
    }

    /// Clicks the element once it is actionable.
    pub async fn click(&self, options: Option<ClickOptions>) -> Result<()> {
        let options = options.unwrap_or_default();
        self.perform(
            Action::Click,
            DispatchOptions {
                timeout: options.timeout.unwrap_or(self.page.options().action_timeout),
                trial: options.is_trial(),
            },
        )
        .await
        .map(|_| ())
    }

    /// Replaces the value of an input, textarea or contenteditable element.
    pub async fn fill(&self, text: &str, options: Option<FillOptions>) -> Result<()> {
        let timeout = options
            .and_then(|o| o.timeout)
            .unwrap_or(self.page.options().action_timeout);
        self.perform(
            Action::Fill(text.to_string()),
            DispatchOptions {
                timeout,
                trial: false,
            },
        )
        .await
        .map(|_| ())
    }

    /// Selects one option in a select element.
    ///
    /// Returns the values that were selected.
    pub async fn select_option(
        &self,
        value: impl Into<SelectOption>,
        options: Option<SelectOptions>,
    ) -> Result<Vec<String>> {
        self.select(vec![value.into()], options).await
    }

    /// Selects several options in a `<select multiple>` element.
    pub async fn select_option_multiple(
        &self,
        values: &[impl Into<SelectOption> + Clone],
        options: Option<SelectOptions>,
    ) -> Result<Vec<String>> {
        let values = values.iter().map(|v| v.clone().into()).collect();
        self.select(values, options).await
    }

    async fn select(
        &self,
        values: Vec<SelectOption>,
        options: Option<SelectOptions>,
    ) -> Result<Vec<String>> {
        let timeout = options
            .and_then(|o| o.timeout)
            .unwrap_or(self.page.options().action_timeout);
        let outcome = self
            .perform(
                Action::SelectOption(values),
                DispatchOptions {
                    timeout,
                    trial: false,
                },
            )
            .await?;
        match outcome {
            ActionOutcome::Selected(values) => Ok(values),
            _ => Ok(Vec::new()),
        }
    }

    /// Adds selector context to errors whose message would not name it.
    fn wrap_error_with_selector(&self, error: Error) -> Error {
        match error {
            Error::ProtocolError(msg) => {
                Error::ProtocolError(format!("{} [selector: {}]", msg, self.selector))
            }
            Error::InvalidArgument(msg) => {
                Error::InvalidArgument(format!("{} [selector: {}]", msg, self.selector))
            }
            other => other,
        }
    }
}

impl PartialEq for Locator {
    fn eq(&self, other: &Self) -> bool {
        self.page == other.page && self.selector == other.selector
    }
}

impl Eq for Locator {}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("page", self.page.id())
            .field("selector", &self.selector.to_string())
            .finish()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)
    }
}
