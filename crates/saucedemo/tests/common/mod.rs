// Shared fixtures and scenarios
//
// Scenario bodies live here so that the simulated and the live test
// binaries run exactly the same steps.
#![allow(dead_code)]

pub mod cart;
pub mod inventory;

use anyhow::{Context, Result};
use autowait::driver::cdp::CdpDriver;
use autowait::{BrowserContext, ConnectOptions, EngineOptions, Locator, Page};
use saucedemo::{SimulatedStore, SuiteConfig};
use std::time::Duration;

/// Installs a fmt subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// One browser tab pointed at a store.
pub struct Suite {
    pub config: SuiteConfig,
    pub context: BrowserContext,
    pub page: Page,
    /// Set when running against the simulated store.
    pub store: Option<SimulatedStore>,
}

impl Suite {
    /// Fresh simulated store with its own session.
    pub async fn simulated() -> Result<Self> {
        init_tracing();
        let config = SuiteConfig::default();
        let store = SimulatedStore::new(&config);
        let options = EngineOptions::new()
            .all_timeouts(Duration::from_secs(3))
            .poll_interval(Duration::from_millis(20));
        let context = BrowserContext::with_options(store.driver(), options).await?;
        let page = context.new_page("about:blank").await?;
        Ok(Self {
            config,
            context,
            page,
            store: Some(store),
        })
    }

    /// New tab in the browser behind `AUTOWAIT_CDP_ENDPOINT`, aimed at the
    /// store from the `SAUCEDEMO_*` variables.
    pub async fn live() -> Result<Self> {
        init_tracing();
        let config = SuiteConfig::from_env()?;
        let connect = ConnectOptions::from_env()
            .with_context(|| format!("{} is not set", ConnectOptions::ENDPOINT_ENV))?;
        let driver = CdpDriver::connect(connect).await?;
        let context = BrowserContext::new(driver).await?;
        let page = context.new_page("about:blank").await?;
        Ok(Self {
            config,
            context,
            page,
            store: None,
        })
    }

    pub fn locator(&self, selector: &str) -> Locator {
        self.page.locator(selector)
    }

    /// Closes the tab this suite opened.
    pub async fn finish(self) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}

/// `[data-test="value"]`
pub fn test_id(value: &str) -> String {
    format!(r#"[data-test="{value}"]"#)
}

/// Parses a price such as `$29.99`.
pub fn parse_price(text: &str) -> Result<f64> {
    text.trim()
        .trim_start_matches('$')
        .parse()
        .with_context(|| format!("Not a price: '{text}'"))
}
