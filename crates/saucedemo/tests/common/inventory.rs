// Inventory page scenarios
//
// Each starts logged in on the inventory page.

use super::{Suite, parse_price, test_id};
use anyhow::{Result, ensure};
use autowait::{UrlPattern, expect, expect_page};
use saucedemo::LoginPage;

/// Footer links and the domain each one lands on.
pub const SOCIAL_LINKS: [(&str, &str); 3] = [
    ("social-twitter", "x.com"),
    ("social-facebook", "facebook.com"),
    ("social-linkedin", "linkedin.com"),
];

pub async fn log_in(suite: &Suite) -> Result<()> {
    LoginPage::new(&suite.page, &suite.config)
        .login_as_configured_user()
        .await?;
    Ok(())
}

async fn open_menu(suite: &Suite) -> Result<()> {
    suite
        .locator(&test_id("open-menu"))
        .locator("xpath=..")
        .click(None)
        .await?;
    expect(suite.locator(".bm-menu-wrap")).to_be_visible().await?;
    Ok(())
}

pub async fn lists_products(suite: &Suite) -> Result<()> {
    log_in(suite).await?;

    let names = suite.locator(&test_id("inventory-item-name"));
    expect(names.clone()).to_have_count(6).await?;
    expect(names.nth(0))
        .to_have_text("Sauce Labs Backpack")
        .await?;
    expect(names.nth(5))
        .to_have_text("Test.allTheThings() T-Shirt (Red)")
        .await?;
    Ok(())
}

pub async fn adds_and_removes_from_cart(suite: &Suite) -> Result<()> {
    log_in(suite).await?;

    let badge = suite.locator(&test_id("shopping-cart-badge"));
    expect(badge.clone()).to_have_count(0).await?;

    suite
        .locator(&test_id("add-to-cart-sauce-labs-backpack"))
        .click(None)
        .await?;
    expect(badge.clone()).to_have_text("1").await?;

    suite
        .locator(&test_id("remove-sauce-labs-backpack"))
        .click(None)
        .await?;
    expect(badge).to_have_count(0).await?;
    Ok(())
}

pub async fn sorts_by_price(suite: &Suite) -> Result<()> {
    log_in(suite).await?;

    suite
        .locator(&test_id("product-sort-container"))
        .select_option("lohi", None)
        .await?;
    expect(suite.locator(&test_id("active-option")))
        .to_have_text("Price (low to high)")
        .await?;

    let texts = suite
        .locator(&test_id("inventory-item-price"))
        .all_inner_texts()
        .await?;
    let prices = texts
        .iter()
        .map(|text| parse_price(text))
        .collect::<Result<Vec<_>>>()?;
    ensure!(prices.len() == 6, "Expected 6 prices, got {prices:?}");
    ensure!(
        prices.windows(2).all(|pair| pair[0] <= pair[1]),
        "Prices not ascending: {prices:?}"
    );
    Ok(())
}

pub async fn follows_about_link(suite: &Suite) -> Result<()> {
    log_in(suite).await?;
    open_menu(suite).await?;

    let about = suite.locator(&test_id("about-sidebar-link"));
    let saucelabs = UrlPattern::regex(r"saucelabs\.com")?;
    tokio::try_join!(
        suite.page.wait_for_url(saucelabs.clone(), None),
        about.click(None),
    )?;
    expect_page(&suite.page).to_have_url(saucelabs).await?;
    Ok(())
}

pub async fn opens_social_links_in_new_tabs(suite: &Suite) -> Result<()> {
    log_in(suite).await?;

    for (link, domain) in SOCIAL_LINKS {
        let link = suite.locator(&test_id(link));
        let tab = suite.context.expect_page(|| link.click(None)).await?;
        tab.wait_for_load_state(None, None).await?;
        expect_page(&tab).to_have_url_containing(domain).await?;
        tab.close().await?;
    }
    ensure!(!suite.page.is_closed(), "Store tab closed with the popups");
    Ok(())
}
