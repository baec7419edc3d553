use std::time::{Duration, Instant};

/// Default timeout for actions and navigation (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for assertions (5 seconds).
pub const DEFAULT_ASSERTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default polling interval for assertions (100ms)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Stand-in deadline for budgets too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Absolute deadline `timeout` from now.
///
/// Saturates instead of overflowing, so `Duration::MAX` means "wait forever".
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Engine-wide deadlines, owned by a `BrowserContext` and handed to every
/// page and locator created from it.
///
/// Nothing in the engine reads a process-wide default: each wait takes its
/// deadline from these options unless the call overrides it.
///
/// # Example
///
/// ```ignore
/// use autowait::EngineOptions;
/// use std::time::Duration;
///
/// let options = EngineOptions::new()
///     .expect_timeout(Duration::from_secs(10))
///     .poll_interval(Duration::from_millis(50));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Budget for an action's actionability wait
    pub action_timeout: Duration,
    /// Budget for an assertion's retry loop
    pub expect_timeout: Duration,
    /// Budget for URL and load-state waits
    pub navigation_timeout: Duration,
    /// Budget for new-context waits
    pub context_timeout: Duration,
    /// Sleep between assertion polls
    pub poll_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            action_timeout: DEFAULT_TIMEOUT,
            expect_timeout: DEFAULT_ASSERTION_TIMEOUT,
            navigation_timeout: DEFAULT_TIMEOUT,
            context_timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl EngineOptions {
    /// Creates `EngineOptions` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the action timeout.
    pub fn action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Set the assertion timeout.
    pub fn expect_timeout(mut self, timeout: Duration) -> Self {
        self.expect_timeout = timeout;
        self
    }

    /// Set the navigation timeout.
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set the new-context timeout.
    pub fn context_timeout(mut self, timeout: Duration) -> Self {
        self.context_timeout = timeout;
        self
    }

    /// Set the assertion poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets every timeout at once, keeping the poll interval.
    pub fn all_timeouts(self, timeout: Duration) -> Self {
        Self {
            action_timeout: timeout,
            expect_timeout: timeout,
            navigation_timeout: timeout,
            context_timeout: timeout,
            ..self
        }
    }
}
