//! Simulated demo store
//!
//! [`SimulatedStore`] is a [`Site`] for the in-memory driver that serves the
//! pages the suite visits: login, inventory, product detail, cart and the
//! checkout steps. Pages carry the same `data-test` hooks, ids and classes
//! as the public store, so the same scenarios run against either.
//!
//! Session state (who is logged in, the cart, the sort order) lives in the
//! store and is shared by every tab, like the public store's local storage.
//! Pages are rendered from that state; handlers update it and re-render.

pub mod accounts;
pub mod catalog;
mod views;

pub use accounts::LoginError;
pub use catalog::{PRODUCTS, Product, SortOrder, format_price};

use crate::config::SuiteConfig;
use autowait::driver::memory::{ABOUT_BLANK, MemoryDriver, NodeSpec, Site, element};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Delay between a navigation starting and its commit.
pub const NAVIGATION_DELAY: Duration = Duration::from_millis(30);

/// How long the side menu slides in before it settles.
pub const MENU_ANIMATION: Duration = Duration::from_millis(250);

/// Sales tax, in percent of the item total.
pub const TAX_PERCENT: u32 = 8;

#[derive(Debug, Clone, Default)]
struct Session {
    user: Option<String>,
    cart: Vec<&'static Product>,
    sort: SortOrder,
}

struct StoreInner {
    base_url: String,
    session: Mutex<Session>,
}

/// In-memory stand-in for the demo store.
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct SimulatedStore {
    inner: Arc<StoreInner>,
}

impl SimulatedStore {
    /// Store served under the configured base URL.
    pub fn new(config: &SuiteConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                base_url: config.base_url().to_string(),
                session: Mutex::new(Session::default()),
            }),
        }
    }

    /// A memory driver serving this store, with a short navigation delay.
    pub fn driver(&self) -> MemoryDriver {
        MemoryDriver::builder(self.clone())
            .navigation_delay(NAVIGATION_DELAY)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Absolute URL of a store page.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Logged-in user, if any.
    pub fn user(&self) -> Option<String> {
        self.inner.session.lock().user.clone()
    }

    /// Cart contents in the order they were added.
    pub fn cart(&self) -> Vec<&'static Product> {
        self.inner.session.lock().cart.clone()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.inner.session.lock().sort
    }

    pub(crate) fn sign_in(&self, username: &str) {
        tracing::debug!("Store session signed in as {}", username);
        self.inner.session.lock().user = Some(username.to_string());
    }

    pub(crate) fn sign_out(&self) {
        tracing::debug!("Store session signed out");
        self.inner.session.lock().user = None;
    }

    pub(crate) fn add_to_cart(&self, product: &'static Product) {
        let mut session = self.inner.session.lock();
        if !session.cart.iter().any(|p| p.id == product.id) {
            session.cart.push(product);
        }
    }

    pub(crate) fn remove_from_cart(&self, product: &'static Product) {
        self.inner.session.lock().cart.retain(|p| p.id != product.id);
    }

    pub(crate) fn set_sort_order(&self, order: SortOrder) {
        self.inner.session.lock().sort = order;
    }

    /// Empties the cart and restores the default sort order.
    pub(crate) fn reset(&self) {
        tracing::debug!("Store app state reset");
        let mut session = self.inner.session.lock();
        session.cart.clear();
        session.sort = SortOrder::default();
    }

    pub(crate) fn complete_order(&self) {
        self.inner.session.lock().cart.clear();
    }

    fn session(&self) -> Session {
        self.inner.session.lock().clone()
    }
}

impl Site for SimulatedStore {
    fn render(&self, url: &str) -> NodeSpec {
        if url == ABOUT_BLANK {
            return element("body");
        }
        let Some(rest) = url.strip_prefix(self.base_url()) else {
            return views::external(url);
        };
        let path = rest.split(['?', '#']).next().unwrap_or_default();
        let session = self.session();

        if matches!(path, "" | "index.html") {
            return views::login(self, None);
        }
        if session.user.is_none() {
            let error = format!(
                "Epic sadface: You can only access '/{path}' when you are logged in."
            );
            return views::login(self, Some(&error));
        }

        match path {
            "inventory.html" => views::inventory(self, &session),
            "inventory-item.html" => match product_id(url).and_then(catalog::find_by_id) {
                Some(product) => views::product(self, &session, product),
                None => views::not_found(),
            },
            "cart.html" => views::cart(self, &session),
            "checkout-step-one.html" => views::checkout_information(self, &session),
            "checkout-step-two.html" => views::checkout_overview(self, &session),
            "checkout-complete.html" => views::checkout_complete(self, &session),
            _ => views::not_found(),
        }
    }
}

fn product_id(url: &str) -> Option<u32> {
    let url = Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autowait::driver::memory::Document;
    use autowait::protocol::Selector;

    fn store() -> SimulatedStore {
        SimulatedStore::new(&SuiteConfig::default())
    }

    fn count(body: NodeSpec, selector: &str) -> usize {
        Document::new(1, body)
            .resolve(&Selector::parse(selector))
            .unwrap()
            .len()
    }

    #[test]
    fn test_protected_pages_render_login_form() {
        let store = store();
        let page = store.render(&store.url("inventory.html"));
        assert_eq!(count(page, r#"[data-test="login-button"]"#), 1);
    }

    #[test]
    fn test_inventory_lists_every_product() {
        let store = store();
        store.sign_in("standard_user");
        let page = store.render(&store.url("inventory.html"));
        assert_eq!(count(page, r#"[data-test="inventory-item-name"]"#), 6);
    }

    #[test]
    fn test_cart_badge_follows_cart() {
        let store = store();
        store.sign_in("standard_user");
        let badge = r#"[data-test="shopping-cart-badge"]"#;
        assert_eq!(count(store.render(&store.url("cart.html")), badge), 0);

        store.add_to_cart(&PRODUCTS[0]);
        store.add_to_cart(&PRODUCTS[0]);
        assert_eq!(store.cart().len(), 1);
        assert_eq!(count(store.render(&store.url("cart.html")), badge), 1);

        store.reset();
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_product_page_by_id() {
        let store = store();
        store.sign_in("standard_user");
        let page = store.render(&store.url("inventory-item.html?id=4"));
        assert_eq!(count(page, r#"[data-test="add-to-cart"]"#), 1);
        let page = store.render(&store.url("inventory-item.html?id=99"));
        assert_eq!(count(page, r#"[data-test="inventory-item-name"]"#), 0);
    }

    #[test]
    fn test_foreign_urls_render_external_page() {
        let store = store();
        let page = store.render("https://saucelabs.com/");
        assert_eq!(count(page, "h1"), 1);
    }
}
