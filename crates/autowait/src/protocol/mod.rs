// Protocol objects - the engine's public model of a driven browser
//
// BrowserContext owns the tab registry, Page is one browsing context,
// Locator is a lazy element descriptor bound to a page.

pub mod action_options;
pub mod actions;
pub mod browser_context;
pub mod locator;
pub mod navigation;
pub mod page;
pub mod select_option;
pub mod selector;

pub use action_options::{ClickOptions, FillOptions, SelectOptions};
pub use actions::{Action, ActionOutcome, DispatchOptions};
pub use browser_context::{BrowserContext, Lifecycle};
pub use locator::Locator;
pub use navigation::UrlPattern;
pub use page::Page;
pub use select_option::SelectOption;
pub use selector::{Selector, SelectorStep};
