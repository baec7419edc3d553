// Navigation tracking
//
// URL and load-state waits for one browsing context. Every wait arms its
// registry subscription before looking at the current state, so a
// transition that already happened is seen immediately and one that happens
// later wakes the waiter.

use crate::api::deadline_after;
use crate::driver::{ContextId, LoadState};
use crate::error::{Error, Result};
use crate::protocol::browser_context::{ContextRegistry, Lifecycle};
use regex::Regex;
use std::fmt;
use std::time::{Duration, Instant};

/// What a URL wait is looking for.
///
/// String conversions pick the variant from the text: anything containing
/// `*` is a glob (`**/cart.html`), everything else must match exactly.
///
/// # Example
///
/// ```ignore
/// use autowait::UrlPattern;
///
/// let exact = UrlPattern::from("https://www.saucedemo.com/inventory.html");
/// let glob = UrlPattern::from("**/cart.html");
/// let domain = UrlPattern::contains("linkedin.com");
/// let regex = UrlPattern::regex(r"inventory\.html$")?;
/// ```
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// The whole URL equals the string
    Exact(String),
    /// The URL contains the string
    Contains(String),
    /// The URL matches a glob, `*` spanning `/`
    Glob(glob::Pattern),
    /// The regex matches somewhere in the URL
    Regex(Regex),
}

impl UrlPattern {
    pub fn contains(needle: impl Into<String>) -> Self {
        UrlPattern::Contains(needle.into())
    }

    pub fn glob(pattern: &str) -> Result<Self> {
        glob::Pattern::new(pattern)
            .map(UrlPattern::Glob)
            .map_err(|e| Error::InvalidArgument(format!("Invalid URL glob '{}': {}", pattern, e)))
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(UrlPattern::Regex)
            .map_err(|e| Error::InvalidArgument(format!("Invalid URL regex: {}", e)))
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            UrlPattern::Exact(expected) => url == expected,
            UrlPattern::Contains(needle) => url.contains(needle.as_str()),
            UrlPattern::Glob(pattern) => pattern.matches(url),
            UrlPattern::Regex(regex) => regex.is_match(url),
        }
    }
}

impl From<&str> for UrlPattern {
    fn from(pattern: &str) -> Self {
        if pattern.contains('*') {
            if let Ok(glob) = glob::Pattern::new(pattern) {
                return UrlPattern::Glob(glob);
            }
        }
        UrlPattern::Exact(pattern.to_string())
    }
}

impl From<String> for UrlPattern {
    fn from(pattern: String) -> Self {
        UrlPattern::from(pattern.as_str())
    }
}

impl From<Regex> for UrlPattern {
    fn from(regex: Regex) -> Self {
        UrlPattern::Regex(regex)
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlPattern::Exact(url) => write!(f, "'{}'", url),
            UrlPattern::Contains(needle) => write!(f, "containing '{}'", needle),
            UrlPattern::Glob(pattern) => write!(f, "matching glob '{}'", pattern.as_str()),
            UrlPattern::Regex(regex) => write!(f, "matching /{}/", regex.as_str()),
        }
    }
}

/// URL and load-state waits for one context.
pub(crate) struct NavigationTracker<'a> {
    registry: &'a ContextRegistry,
    id: &'a ContextId,
}

impl<'a> NavigationTracker<'a> {
    pub(crate) fn new(registry: &'a ContextRegistry, id: &'a ContextId) -> Self {
        Self { registry, id }
    }

    fn closed(&self) -> Error {
        Error::page_closed(format!("Page {} closed while waiting", self.id))
    }

    fn last_url(&self) -> String {
        self.registry
            .get(self.id)
            .map(|record| record.url)
            .unwrap_or_default()
    }

    /// Number of committed navigations seen so far.
    pub(crate) fn navigation_count(&self) -> u64 {
        self.registry
            .get(self.id)
            .map(|record| record.navigations)
            .unwrap_or(0)
    }

    pub(crate) async fn wait_for_url(&self, pattern: &UrlPattern, timeout: Duration) -> Result<()> {
        let deadline = deadline_after(timeout);
        let outcome = self
            .registry
            .wait_for(deadline, |registry| {
                let record = registry.get(self.id)?;
                if record.lifecycle == Lifecycle::Closed {
                    return Some(Err(self.closed()));
                }
                pattern.matches(&record.url).then_some(Ok(()))
            })
            .await;
        match outcome {
            Some(result) => result,
            None => Err(Error::NavigationTimeout {
                pattern: pattern.to_string(),
                last_url: self.last_url(),
                timeout,
            }),
        }
    }

    /// Waits for a navigation committed after `after` navigations had been
    /// seen. `target` only labels the timeout error.
    pub(crate) async fn wait_for_navigation(
        &self,
        after: u64,
        target: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<()> {
        let outcome = self
            .registry
            .wait_for(deadline, |registry| {
                let record = registry.get(self.id)?;
                if record.lifecycle == Lifecycle::Closed {
                    return Some(Err(self.closed()));
                }
                (record.navigations > after).then_some(Ok(()))
            })
            .await;
        match outcome {
            Some(result) => result,
            None => Err(Error::NavigationTimeout {
                pattern: format!("'{}'", target),
                last_url: self.last_url(),
                timeout,
            }),
        }
    }

    pub(crate) async fn wait_for_load_state(
        &self,
        state: LoadState,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<()> {
        let outcome = self
            .registry
            .wait_for(deadline, |registry| {
                let record = registry.get(self.id)?;
                if record.lifecycle == Lifecycle::Closed {
                    return Some(Err(self.closed()));
                }
                (record.load_state >= Some(state)).then_some(Ok(()))
            })
            .await;
        match outcome {
            Some(result) => result,
            None => {
                let reached = self.registry.get(self.id).and_then(|r| r.load_state);
                Err(Error::Timeout(format!(
                    "Page {} did not reach load state '{}' within {:?} (last state: {}, URL '{}')",
                    self.id,
                    state,
                    timeout,
                    reached.map_or_else(|| "none".to_string(), |s| s.to_string()),
                    self.last_url()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_patterns_pick_variant() {
        assert!(matches!(UrlPattern::from("**/cart.html"), UrlPattern::Glob(_)));
        assert!(matches!(
            UrlPattern::from("https://www.saucedemo.com/"),
            UrlPattern::Exact(_)
        ));
    }

    #[test]
    fn test_glob_spans_path_separators() {
        let pattern = UrlPattern::from("**/cart.html");
        assert!(pattern.matches("https://www.saucedemo.com/cart.html"));
        assert!(!pattern.matches("https://www.saucedemo.com/cart.html?x=1"));
        assert!(!pattern.matches("https://www.saucedemo.com/inventory.html"));
    }

    #[test]
    fn test_regex_searches_whole_url() {
        let pattern = UrlPattern::regex(r"linkedin\.com").unwrap();
        assert!(pattern.matches("https://www.linkedin.com/company/sauce-labs/"));
        assert!(UrlPattern::regex("(").is_err());
    }

    #[test]
    fn test_display_describes_pattern() {
        assert_eq!(UrlPattern::contains("x.com").to_string(), "containing 'x.com'");
        assert_eq!(UrlPattern::from("**/cart.html").to_string(), "matching glob '**/cart.html'");
    }
}
