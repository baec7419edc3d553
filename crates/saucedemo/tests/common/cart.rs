// Cart page scenarios
//
// Each starts logged in with the backpack in the cart and the cart open.

use super::{Suite, test_id};
use anyhow::Result;
use autowait::{UrlPattern, expect, expect_page};
use saucedemo::LoginPage;

pub async fn open_cart_with_backpack(suite: &Suite) -> Result<()> {
    LoginPage::new(&suite.page, &suite.config)
        .login_as_configured_user()
        .await?;
    suite
        .locator(&test_id("add-to-cart-sauce-labs-backpack"))
        .click(None)
        .await?;
    suite.locator(&test_id("shopping-cart-link")).click(None).await?;
    expect_page(&suite.page)
        .to_have_url(UrlPattern::regex(r"cart\.html$")?)
        .await?;
    Ok(())
}

pub async fn shows_cart_headings(suite: &Suite) -> Result<()> {
    open_cart_with_backpack(suite).await?;

    expect(suite.locator(&test_id("title")))
        .to_have_text("Your Cart")
        .await?;
    expect(suite.locator(&test_id("cart-quantity-label")))
        .to_have_text("QTY")
        .await?;
    expect(suite.locator(&test_id("cart-desc-label")))
        .to_have_text("Description")
        .await?;
    Ok(())
}

pub async fn lists_added_item(suite: &Suite) -> Result<()> {
    open_cart_with_backpack(suite).await?;

    let items = suite.locator(&test_id("inventory-item"));
    expect(items.clone()).to_have_count(1).await?;

    let item = items.first();
    expect(item.locator(&test_id("inventory-item-name")))
        .to_have_text("Sauce Labs Backpack")
        .await?;
    expect(item.locator(&test_id("item-quantity")))
        .to_have_text("1")
        .await?;
    expect(item.locator(&test_id("inventory-item-price")))
        .to_have_text("$29.99")
        .await?;
    Ok(())
}

pub async fn removes_item(suite: &Suite) -> Result<()> {
    open_cart_with_backpack(suite).await?;
    let rows = suite.locator(&test_id("inventory-item"));
    expect(rows.clone()).to_have_count(1).await?;

    suite
        .locator(&test_id("remove-sauce-labs-backpack"))
        .click(None)
        .await?;

    expect(rows).to_have_count(0).await?;
    expect(suite.locator(&test_id("cart-item")))
        .to_have_count(0)
        .await?;
    expect(suite.locator(&test_id("shopping-cart-badge")))
        .to_have_count(0)
        .await?;
    Ok(())
}

pub async fn continues_shopping(suite: &Suite) -> Result<()> {
    open_cart_with_backpack(suite).await?;

    suite.locator(&test_id("continue-shopping")).click(None).await?;
    expect_page(&suite.page)
        .to_have_url(UrlPattern::regex(r"inventory\.html$")?)
        .await?;
    Ok(())
}

pub async fn proceeds_to_checkout(suite: &Suite) -> Result<()> {
    open_cart_with_backpack(suite).await?;

    suite.locator(&test_id("checkout")).click(None).await?;
    expect_page(&suite.page)
        .to_have_url(UrlPattern::regex(r"checkout-step-one\.html$")?)
        .await?;
    Ok(())
}

pub async fn resets_app_state_from_menu(suite: &Suite) -> Result<()> {
    open_cart_with_backpack(suite).await?;

    // The burger icon sits inside the clickable button wrapper
    suite
        .locator(&test_id("open-menu"))
        .locator("xpath=..")
        .click(None)
        .await?;
    expect(suite.locator(".bm-menu-wrap")).to_be_visible().await?;

    suite.locator(&test_id("reset-sidebar-link")).click(None).await?;
    expect(suite.locator(&test_id("shopping-cart-badge")))
        .to_have_count(0)
        .await?;
    Ok(())
}
