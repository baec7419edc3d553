// Action dispatcher
//
// Performs one user-intent action on the single element a locator resolves
// to, once that element is actionable. Every poll re-resolves the locator and
// re-reads the element's state, and the input is only delivered right after
// a poll found every actionability flag set.

use crate::api::deadline_after;
use crate::driver::{ActionableState, ElementHandle};
use crate::error::{Error, Result};
use crate::protocol::{Locator, SelectOption};
use std::time::{Duration, Instant};

/// Waits between actionability polls; the last entry repeats.
const BACKOFF: [Duration; 6] = [
    Duration::ZERO,
    Duration::from_millis(20),
    Duration::from_millis(50),
    Duration::from_millis(100),
    Duration::from_millis(100),
    Duration::from_millis(500),
];

/// A user-intent action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Click,
    Fill(String),
    SelectOption(Vec<SelectOption>),
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::Fill(_) => "fill",
            Action::SelectOption(_) => "select_option",
        }
    }
}

/// What a completed dispatch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The input was delivered
    Performed,
    /// Trial run: the element was actionable, nothing was delivered
    Checked,
    /// Options were selected; carries their values
    Selected(Vec<String>),
}

/// Per-call dispatch settings.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub timeout: Duration,
    pub trial: bool,
}

enum Poll {
    Missing,
    Waiting(ActionableState),
    Stale,
}

/// Performs `action` on the element `locator` resolves to.
///
/// - More than one match fails at once with `AmbiguousMatch`.
/// - Zero matches are re-resolved until the deadline, then fail with
///   `AmbiguousMatch` (count 0).
/// - An element that never becomes actionable fails with `NotActionable`,
///   carrying the flags of the last poll.
/// - A handle that goes stale between the check and the dispatch restarts the
///   loop; the input was not delivered.
///
/// Navigation the action triggers is not awaited.
pub async fn perform(
    locator: &Locator,
    action: &Action,
    options: DispatchOptions,
) -> Result<ActionOutcome> {
    let DispatchOptions { timeout, trial } = options;
    let deadline = deadline_after(timeout);
    let driver = locator.page().driver();
    let mut attempt = 0;

    loop {
        locator.page().ensure_open()?;

        let handles = locator.resolve().await?;
        let poll = match handles.as_slice() {
            [] => Poll::Missing,
            [handle] => match driver.element_state(handle).await {
                Ok(state) if state.is_actionable() => {
                    if trial {
                        return Ok(ActionOutcome::Checked);
                    }
                    match dispatch(locator, handle, action).await {
                        Err(Error::StaleElement(reason)) => {
                            tracing::debug!(
                                "{} on '{}' found a stale handle ({}), re-resolving",
                                action.name(),
                                locator.selector(),
                                reason
                            );
                            Poll::Stale
                        }
                        outcome => return outcome,
                    }
                }
                Ok(state) => Poll::Waiting(state),
                Err(Error::StaleElement(_)) => Poll::Stale,
                Err(e) => return Err(e),
            },
            many => {
                return Err(Error::AmbiguousMatch {
                    selector: locator.selector().to_string(),
                    count: many.len(),
                });
            }
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(match poll {
                Poll::Waiting(state) => Error::NotActionable {
                    selector: locator.selector().to_string(),
                    state,
                    timeout,
                },
                Poll::Stale => Error::NotActionable {
                    selector: locator.selector().to_string(),
                    state: ActionableState::detached(),
                    timeout,
                },
                Poll::Missing => Error::AmbiguousMatch {
                    selector: locator.selector().to_string(),
                    count: 0,
                },
            });
        }

        if let Poll::Waiting(state) = &poll {
            tracing::debug!(
                "{} on '{}' waiting for actionability: {}",
                action.name(),
                locator.selector(),
                state
            );
        }
        let wait = BACKOFF[attempt.min(BACKOFF.len() - 1)].min(deadline - now);
        attempt += 1;
        tokio::time::sleep(wait).await;
    }
}

async fn dispatch(
    locator: &Locator,
    handle: &ElementHandle,
    action: &Action,
) -> Result<ActionOutcome> {
    let driver = locator.page().driver();
    match action {
        Action::Click => driver.click(handle).await.map(|_| ActionOutcome::Performed),
        Action::Fill(text) => driver.fill(handle, text).await.map(|_| ActionOutcome::Performed),
        Action::SelectOption(options) => driver
            .select_options(handle, options)
            .await
            .map(ActionOutcome::Selected),
    }
}
