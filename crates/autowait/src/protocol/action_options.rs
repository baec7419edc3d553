// Per-call options for actions
//
// Every field is optional; an unset timeout falls back to the page's
// `EngineOptions::action_timeout`.

use std::time::Duration;

/// Options for [`Locator::click`](crate::Locator::click).
///
/// # Example
///
/// ```ignore
/// use autowait::ClickOptions;
/// use std::time::Duration;
///
/// // Actionability checks only, no click is delivered
/// let options = ClickOptions::builder()
///     .trial(true)
///     .timeout(Duration::from_secs(2))
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClickOptions {
    /// How long to wait for a single actionable match
    pub timeout: Option<Duration>,
    /// Run the waits and checks, then return without clicking
    pub trial: Option<bool>,
}

impl ClickOptions {
    pub fn builder() -> ClickOptionsBuilder {
        ClickOptionsBuilder::default()
    }

    pub(crate) fn is_trial(&self) -> bool {
        self.trial.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClickOptionsBuilder {
    options: ClickOptions,
}

impl ClickOptionsBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn trial(mut self, trial: bool) -> Self {
        self.options.trial = Some(trial);
        self
    }

    pub fn build(self) -> ClickOptions {
        self.options
    }
}

/// Options for [`Locator::fill`](crate::Locator::fill).
#[derive(Debug, Clone, Copy, Default)]
pub struct FillOptions {
    pub timeout: Option<Duration>,
}

impl FillOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options for [`Locator::select_option`](crate::Locator::select_option).
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectOptions {
    pub timeout: Option<Duration>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_options_builder() {
        let options = ClickOptions::builder()
            .timeout(Duration::from_millis(250))
            .trial(true)
            .build();
        assert_eq!(options.timeout, Some(Duration::from_millis(250)));
        assert!(options.is_trial());
        assert!(!ClickOptions::default().is_trial());
    }

    #[test]
    fn test_defaults_defer_to_engine_options() {
        assert!(ClickOptions::default().timeout.is_none());
        assert!(FillOptions::new().timeout.is_none());
        assert_eq!(
            SelectOptions::new().timeout(Duration::from_secs(1)).timeout,
            Some(Duration::from_secs(1))
        );
    }
}
