//! Cart and inventory scenarios for the Sauce Labs demo store
//!
//! The suite drives the store through [`autowait`]. Two targets are
//! supported:
//!
//! - [`SimulatedStore`], an in-memory copy of the store's pages served by
//!   the memory driver. The regular test run uses it.
//! - The public store (or any deployment of it) through the DevTools
//!   driver, for the ignored live tests.
//!
//! # Example
//!
//! ```ignore
//! use autowait::{BrowserContext, expect};
//! use saucedemo::{LoginPage, SimulatedStore, SuiteConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SuiteConfig::from_env()?;
//! let store = SimulatedStore::new(&config);
//! let context = BrowserContext::new(store.driver()).await?;
//! let page = context.new_page("about:blank").await?;
//!
//! LoginPage::new(&page, &config).login_as_configured_user().await?;
//! expect(page.locator(r#"[data-test="inventory-item-name"]"#))
//!     .to_have_count(6)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pages;
pub mod store;

pub use config::{ConfigError, SuiteConfig};
pub use pages::LoginPage;
pub use store::SimulatedStore;
