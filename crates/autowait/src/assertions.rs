// Assertions - auto-retrying expectations
//
// Every matcher runs the same loop: check the page is open, re-resolve the
// locator, observe, compare. A match returns at once; otherwise the loop
// sleeps the poll interval and tries again until the deadline, then fails
// with the last value it observed.

use crate::api::deadline_after;
use crate::error::{Error, Result};
use crate::protocol::{Locator, Page, UrlPattern};
use regex::Regex;
use std::future::Future;
use std::time::{Duration, Instant};

/// Creates an expectation for a locator with auto-retry behavior.
///
/// Timeout and poll interval default to the [`EngineOptions`](crate::EngineOptions)
/// of the context the locator's page belongs to.
///
/// # Example
///
/// ```ignore
/// use autowait::{Page, expect};
/// use std::time::Duration;
///
/// # async fn example(page: Page) -> autowait::Result<()> {
/// let badge = page.locator(r#"[data-test="shopping-cart-badge"]"#);
/// expect(badge.clone()).to_have_text("1").await?;
///
/// page.click(r#"[data-test="remove-sauce-labs-backpack"]"#, None).await?;
/// expect(badge).to_have_count(0).await?;
///
/// expect(page.locator(".bm-menu-wrap"))
///     .with_timeout(Duration::from_secs(2))
///     .not()
///     .to_be_visible()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub fn expect(locator: Locator) -> Expectation {
    Expectation::new(locator)
}

/// Creates an expectation for a page's URL.
pub fn expect_page(page: &Page) -> PageExpectation {
    PageExpectation::new(page.clone())
}

#[derive(Debug, Clone, Copy)]
struct Polling {
    timeout: Duration,
    poll_interval: Duration,
    negate: bool,
}

impl Polling {
    fn for_page(page: &Page) -> Self {
        let options = page.options();
        Self {
            timeout: options.expect_timeout,
            poll_interval: options.poll_interval,
            negate: false,
        }
    }
}

/// One poll's result: whether the positive condition held, and what was seen.
struct Observation {
    holds: bool,
    actual: String,
}

impl Observation {
    fn new(holds: bool, actual: impl Into<String>) -> Self {
        Self {
            holds,
            actual: actual.into(),
        }
    }

    /// No single element to observe. Never satisfies a positive condition.
    fn missing(actual: impl Into<String>) -> Self {
        Self::new(false, actual)
    }
}

/// Turns "nothing to look at" errors into observations so the loop keeps
/// polling; everything else aborts the assertion.
fn observe_error(error: Error) -> Result<Observation> {
    match error {
        Error::StaleElement(_) => Ok(Observation::missing("<element detached>")),
        Error::AmbiguousMatch { count: 0, .. } => Ok(Observation::missing("<no element>")),
        Error::AmbiguousMatch { count, .. } => {
            Ok(Observation::missing(format!("<{} elements>", count)))
        }
        other => Err(other),
    }
}

fn quoted(value: &str) -> String {
    format!("'{}'", value)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

async fn poll_until<F, Fut>(
    page: &Page,
    polling: Polling,
    subject: String,
    expected: String,
    mut observe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation>>,
{
    let deadline = deadline_after(polling.timeout);
    loop {
        page.ensure_open()?;
        let observation = match observe().await {
            Ok(observation) => observation,
            Err(e) => observe_error(e)?,
        };

        if observation.holds != polling.negate {
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            let expected = if polling.negate {
                format!("not {}", expected)
            } else {
                expected
            };
            return Err(Error::AssertionTimeout {
                subject,
                expected,
                actual: observation.actual,
                timeout: polling.timeout,
            });
        }

        tracing::debug!(
            "Expected {} {}{}, got {}; retrying",
            subject,
            if polling.negate { "not " } else { "" },
            expected,
            observation.actual
        );
        tokio::time::sleep(polling.poll_interval.min(deadline - now)).await;
    }
}

/// Expectation wraps a locator and provides assertion methods with auto-retry.
pub struct Expectation {
    locator: Locator,
    polling: Polling,
}

// Matchers are named to_* but consume the expectation
#[allow(clippy::wrong_self_convention)]
impl Expectation {
    pub(crate) fn new(locator: Locator) -> Self {
        let polling = Polling::for_page(locator.page());
        Self { locator, polling }
    }

    /// Sets a custom timeout for this assertion.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.polling.timeout = timeout;
        self
    }

    /// Sets a custom poll interval for this assertion.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.polling.poll_interval = interval;
        self
    }

    /// Negates the assertion: it passes once the predicate stops holding.
    #[allow(clippy::should_implement_trait)]
    pub fn not(mut self) -> Self {
        self.polling.negate = true;
        self
    }

    async fn poll<F, Fut>(&self, expected: String, observe: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation>>,
    {
        poll_until(
            self.locator.page(),
            self.polling,
            quoted(&self.locator.selector().to_string()),
            expected,
            observe,
        )
        .await
    }

    /// Asserts that the element's text equals `expected`.
    ///
    /// Whitespace runs collapse to one space and both sides are trimmed
    /// before comparing.
    pub async fn to_have_text(self, expected: &str) -> Result<()> {
        let locator = &self.locator;
        let wanted = normalize_whitespace(expected);
        let wanted = wanted.as_str();
        self.poll(format!("to have text {}", quoted(wanted)), move || async move {
            let text = normalize_whitespace(&locator.text_content().await?.unwrap_or_default());
            Ok(Observation::new(text == wanted, quoted(&text)))
        })
        .await
    }

    /// Asserts that the element's text contains `expected`.
    pub async fn to_contain_text(self, expected: &str) -> Result<()> {
        let locator = &self.locator;
        self.poll(format!("to contain text {}", quoted(expected)), move || async move {
            let text = normalize_whitespace(&locator.text_content().await?.unwrap_or_default());
            Ok(Observation::new(text.contains(expected), quoted(&text)))
        })
        .await
    }

    /// Asserts that the element's text matches `pattern` anywhere.
    ///
    /// An invalid pattern fails at once with `InvalidArgument`.
    pub async fn to_have_text_regex(self, pattern: &str) -> Result<()> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::InvalidArgument(format!("Invalid regex: {}", e)))?;
        let regex = &regex;
        let locator = &self.locator;
        self.poll(format!("to match /{}/", pattern), move || async move {
            let text = normalize_whitespace(&locator.text_content().await?.unwrap_or_default());
            Ok(Observation::new(regex.is_match(&text), quoted(&text)))
        })
        .await
    }

    /// Asserts that exactly `expected` elements match.
    pub async fn to_have_count(self, expected: usize) -> Result<()> {
        let locator = &self.locator;
        self.poll(format!("to have count {}", expected), move || async move {
            let count = locator.count().await?;
            Ok(Observation::new(count == expected, count.to_string()))
        })
        .await
    }

    /// Asserts that the element is visible.
    pub async fn to_be_visible(self) -> Result<()> {
        let locator = &self.locator;
        self.poll("to be visible".to_string(), move || async move {
            let visible = locator.is_visible().await?;
            Ok(Observation::new(visible, if visible { "visible" } else { "hidden" }))
        })
        .await
    }

    /// Asserts that the element is hidden or absent.
    pub async fn to_be_hidden(self) -> Result<()> {
        let locator = &self.locator;
        self.poll("to be hidden".to_string(), move || async move {
            let visible = locator.is_visible().await?;
            Ok(Observation::new(!visible, if visible { "visible" } else { "hidden" }))
        })
        .await
    }

    pub async fn to_be_enabled(self) -> Result<()> {
        let locator = &self.locator;
        self.poll("to be enabled".to_string(), move || async move {
            let enabled = locator.is_enabled().await?;
            Ok(Observation::new(enabled, if enabled { "enabled" } else { "disabled" }))
        })
        .await
    }

    pub async fn to_be_disabled(self) -> Result<()> {
        let locator = &self.locator;
        self.poll("to be disabled".to_string(), move || async move {
            let enabled = locator.is_enabled().await?;
            Ok(Observation::new(!enabled, if enabled { "enabled" } else { "disabled" }))
        })
        .await
    }

    /// Asserts that attribute `name` is present with exactly `value`.
    pub async fn to_have_attribute(self, name: &str, value: &str) -> Result<()> {
        let locator = &self.locator;
        self.poll(
            format!("to have attribute {}={}", name, quoted(value)),
            move || async move {
                Ok(match locator.get_attribute(name).await? {
                    Some(actual) => Observation::new(actual == value, quoted(&actual)),
                    None => Observation::new(false, "<absent>"),
                })
            },
        )
        .await
    }

    /// Asserts the current value of an input, textarea or select.
    pub async fn to_have_value(self, expected: &str) -> Result<()> {
        let locator = &self.locator;
        self.poll(format!("to have value {}", quoted(expected)), move || async move {
            let value = locator.input_value().await?;
            Ok(Observation::new(value == expected, quoted(&value)))
        })
        .await
    }
}

/// Expectation over a page's URL.
pub struct PageExpectation {
    page: Page,
    polling: Polling,
}

#[allow(clippy::wrong_self_convention)]
impl PageExpectation {
    pub(crate) fn new(page: Page) -> Self {
        let polling = Polling::for_page(&page);
        Self { page, polling }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.polling.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.polling.poll_interval = interval;
        self
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(mut self) -> Self {
        self.polling.negate = true;
        self
    }

    /// Asserts that the URL matches `pattern`.
    ///
    /// Plain strings match exactly, strings with `*` are globs.
    pub async fn to_have_url(self, pattern: impl Into<UrlPattern>) -> Result<()> {
        let pattern = pattern.into();
        let page = &self.page;
        let pattern_ref = &pattern;
        poll_until(
            page,
            self.polling,
            format!("page {}", page.id()),
            format!("to have URL {}", pattern),
            move || async move {
                let url = page.url();
                Ok(Observation::new(pattern_ref.matches(&url), quoted(&url)))
            },
        )
        .await
    }

    /// Asserts that the URL contains `needle`.
    pub async fn to_have_url_containing(self, needle: &str) -> Result<()> {
        self.to_have_url(UrlPattern::contains(needle)).await
    }
}
