//! autowait: auto-waiting locators, actions and assertions for driven browsers
//!
//! The engine sits between a test scenario and a browser. Scenarios describe
//! elements with lazy [`Locator`]s, perform actions that wait for the element
//! to become actionable, and assert with [`expect`], which retries until the
//! condition holds or the deadline passes. Tabs are tracked by a registry on
//! [`BrowserContext`], so a tab opened by a click can be awaited without
//! racing the event that announces it.
//!
//! The browser itself is reached through the [`driver::BrowserDriver`]
//! trait. Two backends ship with the crate: an in-memory one for
//! deterministic tests, and a Chrome DevTools Protocol one for real browsers.
//!
//! # Examples
//!
//! ## Login and assert the landing page
//!
//! ```ignore
//! use autowait::{BrowserContext, expect, expect_page};
//! use autowait::driver::cdp::CdpDriver;
//! use autowait::api::ConnectOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = CdpDriver::connect(
//!         ConnectOptions::from_env().ok_or("AUTOWAIT_CDP_ENDPOINT is not set")?,
//!     )
//!     .await?;
//!     let context = BrowserContext::new(driver).await?;
//!     let page = context.new_page("https://www.saucedemo.com/").await?;
//!
//!     page.fill(r#"[data-test="username"]"#, "standard_user", None).await?;
//!     page.fill(r#"[data-test="password"]"#, "secret_sauce", None).await?;
//!     page.click(r#"[data-test="login-button"]"#, None).await?;
//!
//!     expect_page(&page).to_have_url_containing("inventory.html").await?;
//!     expect(page.locator(r#"[data-test="title"]"#)).to_have_text("Products").await?;
//!
//!     context.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Waiting for a tab opened by a click
//!
//! ```ignore
//! use autowait::{BrowserContext, Page, expect_page};
//!
//! async fn follow_linkedin(context: &BrowserContext, page: &Page) -> autowait::Result<()> {
//!     let link = page.locator(r#"[data-test="social-linkedin"]"#);
//!     let tab = context.expect_page(|| link.click(None)).await?;
//!     expect_page(&tab).to_have_url_containing("linkedin.com").await?;
//!     tab.close().await
//! }
//! ```
//!
//! ## Snapshot reads for collection properties
//!
//! ```ignore
//! use autowait::Page;
//!
//! async fn prices(page: &Page) -> autowait::Result<Vec<f64>> {
//!     let texts = page
//!         .locator(r#"[data-test="inventory-item-price"]"#)
//!         .all_inner_texts()
//!         .await?;
//!     Ok(texts
//!         .iter()
//!         .filter_map(|t| t.trim_start_matches('$').parse().ok())
//!         .collect())
//! }
//! ```

pub mod api;
mod assertions;
pub mod driver;
mod error;
pub mod protocol;

// Re-export error types
pub use error::{Error, Result};

// Re-export assertions API
pub use assertions::{Expectation, PageExpectation, expect, expect_page};

// Re-export the context, page and locator API
pub use protocol::{BrowserContext, Lifecycle, Locator, Page, UrlPattern};

// Re-export action options and dispatcher types
pub use protocol::{Action, ActionOutcome, ClickOptions, FillOptions, SelectOptions};

// Re-export form and selector types
pub use protocol::{SelectOption, Selector};

// Re-export driver identifiers
pub use driver::{ActionableState, ContextId, LoadState};

// Re-export engine and connection options
pub use api::{ConnectOptions, EngineOptions};
