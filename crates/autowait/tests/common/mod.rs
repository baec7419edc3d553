// Shared helpers for integration tests
//
// Each test binary compiles this module separately and uses a different
// subset of it.
#![allow(dead_code)]

use autowait::driver::memory::{MemoryDriver, NodeSpec, StaticSite, element};
use autowait::{BrowserContext, EngineOptions, Page};
use std::time::Duration;

pub const HOME: &str = "https://shop.test/";
pub const NEXT: &str = "https://shop.test/next.html";
pub const OTHER: &str = "https://other.test/";

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

/// Short deadlines so failure paths finish quickly.
pub fn fast_options() -> EngineOptions {
    EngineOptions::new()
        .action_timeout(Duration::from_secs(1))
        .expect_timeout(Duration::from_secs(1))
        .navigation_timeout(Duration::from_secs(2))
        .context_timeout(Duration::from_secs(2))
        .poll_interval(Duration::from_millis(20))
}

fn item(name: &str, price: &str) -> NodeSpec {
    element("li")
        .class("item")
        .data_test("item")
        .child(element("span").class("name").text(name))
        .child(element("span").class("price").text(price))
        .child(element("button").class("add").text("Add"))
}

fn home() -> NodeSpec {
    element("body").children([
        element("h1").id("title").text("  Welcome\n  home "),
        element("ul").class("items").children([
            item("Alpha", "$1.00"),
            item("Beta", "$2.50"),
            item("Gamma", "$0.75"),
        ]),
        element("button").id("hidden").hidden(true).text("Hidden"),
        element("button").id("disabled").disabled(true).text("Disabled"),
        element("button")
            .id("counter")
            .text("0")
            .on_click(|scope| {
                let count: u32 = scope
                    .text_of("#counter")
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(0);
                scope.set_text("#counter", &(count + 1).to_string());
            }),
        element("input").id("name").on_change(|scope| {
            let name = scope.target_value().unwrap_or_default();
            scope.set_text("#greeting", &format!("Hello {name}"));
        }),
        element("p").id("greeting"),
        element("select").id("sort").children([
            element("option").attr("value", "az").text("Name (A to Z)"),
            element("option").attr("value", "za").text("Name (Z to A)"),
            element("option").attr("value", "lohi").text("Price (low to high)"),
        ]),
        element("a").id("next").attr("href", "/next.html").text("Next"),
        element("a")
            .id("popup")
            .attr("href", OTHER)
            .attr("target", "_blank")
            .text("Other"),
        element("button").id("menu").text("Menu").on_click(|scope| {
            scope.set_hidden(".menu", false);
            scope.set_animating(".menu", true);
            scope.after(Duration::from_millis(150), |scope| {
                scope.set_animating(".menu", false);
            });
        }),
        element("nav")
            .class("menu")
            .hidden(true)
            .child(element("button").id("close").text("Close").on_click(|scope| {
                scope.set_hidden(".menu", true);
            })),
    ])
}

/// The fixture site: a shop home page, a second page and an external site.
pub fn site() -> StaticSite {
    StaticSite::new()
        .page(HOME, home)
        .page(NEXT, || {
            element("body").child(element("h1").id("title").text("Next page"))
        })
        .page(OTHER, || {
            element("body").child(element("h1").id("title").text("Other site"))
        })
}

/// Driver over [`site`] whose navigations commit after 30ms.
pub fn driver() -> MemoryDriver {
    MemoryDriver::builder(site())
        .navigation_delay(Duration::from_millis(30))
        .build()
}

/// A context over `driver` with [`fast_options`] and one page on [`HOME`].
pub async fn open(driver: &MemoryDriver) -> (BrowserContext, Page) {
    let context = BrowserContext::with_options(driver.clone(), fast_options())
        .await
        .expect("Failed to create context");
    let page = context.new_page(HOME).await.expect("Failed to open page");
    (context, page)
}
