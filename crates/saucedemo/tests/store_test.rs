// Behaviour of the simulated store beyond the cart and inventory scenarios
//
// Tests cover:
// - Login errors and the login gate on protected pages
// - Product detail pages
// - The full checkout flow
// - Side menu close and logout
// - Sorting by name descending

mod common;

use autowait::{SelectOption, UrlPattern, expect, expect_page};
use common::{Suite, inventory, test_id};
use saucedemo::LoginPage;
use saucedemo::store::LoginError;

#[tokio::test]
async fn test_locked_out_user_is_refused() {
    let suite = Suite::simulated().await.unwrap();
    let login = LoginPage::new(&suite.page, &suite.config);

    login.goto().await.unwrap();
    login.login("locked_out_user", "secret_sauce").await.unwrap();

    expect(login.error_message())
        .to_have_text(&LoginError::LockedOut.to_string())
        .await
        .unwrap();
    assert_eq!(suite.page.url(), suite.config.base_url());
    assert_eq!(suite.store.as_ref().unwrap().user(), None);
}

#[tokio::test]
async fn test_login_error_banner_is_replaced() {
    let suite = Suite::simulated().await.unwrap();
    let login = LoginPage::new(&suite.page, &suite.config);

    login.goto().await.unwrap();
    login.login("", "").await.unwrap();
    expect(login.error_message())
        .to_have_text("Epic sadface: Username is required")
        .await
        .unwrap();

    login.login("standard_user", "wrong").await.unwrap();
    expect(login.error_message())
        .to_contain_text("do not match any user")
        .await
        .unwrap();
    expect(login.error_message()).to_have_count(1).await.unwrap();
}

#[tokio::test]
async fn test_protected_page_needs_login() {
    let suite = Suite::simulated().await.unwrap();

    suite.page.goto(&suite.config.url("cart.html")).await.unwrap();

    let login = LoginPage::new(&suite.page, &suite.config);
    expect(login.error_message())
        .to_have_text("Epic sadface: You can only access '/cart.html' when you are logged in.")
        .await
        .unwrap();
    expect(login.login_button()).to_be_visible().await.unwrap();
}

#[tokio::test]
async fn test_product_detail_page() {
    let suite = Suite::simulated().await.unwrap();
    inventory::log_in(&suite).await.unwrap();

    suite.locator(&test_id("item-4-title-link")).click(None).await.unwrap();
    expect_page(&suite.page)
        .to_have_url_containing("inventory-item.html?id=4")
        .await
        .unwrap();
    expect(suite.locator(&test_id("inventory-item-name")))
        .to_have_text("Sauce Labs Backpack")
        .await
        .unwrap();

    suite.locator(&test_id("add-to-cart")).click(None).await.unwrap();
    expect(suite.locator(&test_id("shopping-cart-badge")))
        .to_have_text("1")
        .await
        .unwrap();
    expect(suite.locator(&test_id("remove"))).to_be_visible().await.unwrap();

    suite.locator(&test_id("back-to-products")).click(None).await.unwrap();
    expect_page(&suite.page)
        .to_have_url(UrlPattern::regex(r"inventory\.html$").unwrap())
        .await
        .unwrap();
    expect(suite.locator(&test_id("remove-sauce-labs-backpack")))
        .to_be_visible()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_checkout_flow() {
    let suite = Suite::simulated().await.unwrap();
    inventory::log_in(&suite).await.unwrap();

    for slug in ["sauce-labs-backpack", "sauce-labs-bike-light"] {
        suite
            .locator(&test_id(&format!("add-to-cart-{slug}")))
            .click(None)
            .await
            .unwrap();
    }
    expect(suite.locator(&test_id("shopping-cart-badge")))
        .to_have_text("2")
        .await
        .unwrap();

    suite.locator(&test_id("shopping-cart-link")).click(None).await.unwrap();
    suite.locator(&test_id("checkout")).click(None).await.unwrap();
    suite.page.wait_for_url("**/checkout-step-one.html", None).await.unwrap();

    // Every field is required
    suite.locator(&test_id("continue")).click(None).await.unwrap();
    expect(suite.locator(&test_id("error")))
        .to_have_text("Error: First Name is required")
        .await
        .unwrap();

    suite.page.fill(&test_id("firstName"), "Ada", None).await.unwrap();
    suite.page.fill(&test_id("lastName"), "Lovelace", None).await.unwrap();
    suite.page.fill(&test_id("postalCode"), "10115", None).await.unwrap();
    suite.locator(&test_id("continue")).click(None).await.unwrap();
    suite.page.wait_for_url("**/checkout-step-two.html", None).await.unwrap();

    expect(suite.locator(&test_id("inventory-item")))
        .to_have_count(2)
        .await
        .unwrap();
    expect(suite.locator(&test_id("subtotal-label")))
        .to_have_text("Item total: $39.98")
        .await
        .unwrap();
    expect(suite.locator(&test_id("tax-label")))
        .to_have_text("Tax: $3.20")
        .await
        .unwrap();
    expect(suite.locator(&test_id("total-label")))
        .to_have_text("Total: $43.18")
        .await
        .unwrap();

    suite.locator(&test_id("finish")).click(None).await.unwrap();
    expect(suite.locator(&test_id("complete-header")))
        .to_have_text("Thank you for your order!")
        .await
        .unwrap();
    expect(suite.locator(&test_id("shopping-cart-badge")))
        .to_have_count(0)
        .await
        .unwrap();
    assert!(suite.store.as_ref().unwrap().cart().is_empty());
}

#[tokio::test]
async fn test_menu_close_and_logout() {
    let suite = Suite::simulated().await.unwrap();
    inventory::log_in(&suite).await.unwrap();

    let opener = suite.locator(&test_id("open-menu")).locator("xpath=..");
    let menu = suite.locator(".bm-menu-wrap");

    opener.click(None).await.unwrap();
    expect(menu.clone()).to_be_visible().await.unwrap();
    suite.locator("#react-burger-cross-btn").click(None).await.unwrap();
    expect(menu.clone()).to_be_hidden().await.unwrap();

    opener.click(None).await.unwrap();
    suite.locator(&test_id("logout-sidebar-link")).click(None).await.unwrap();
    expect_page(&suite.page)
        .to_have_url(suite.config.base_url())
        .await
        .unwrap();
    expect(LoginPage::new(&suite.page, &suite.config).login_button())
        .to_be_visible()
        .await
        .unwrap();
    assert_eq!(suite.store.as_ref().unwrap().user(), None);
}

#[tokio::test]
async fn test_sort_by_name_descending() {
    let suite = Suite::simulated().await.unwrap();
    inventory::log_in(&suite).await.unwrap();

    let selected = suite
        .page
        .select_option(
            &test_id("product-sort-container"),
            SelectOption::Label("Name (Z to A)".to_string()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(selected, vec!["za"]);

    let names = suite.locator(&test_id("inventory-item-name"));
    expect(names.first())
        .to_have_text("Test.allTheThings() T-Shirt (Red)")
        .await
        .unwrap();
    expect(names.last())
        .to_have_text("Sauce Labs Backpack")
        .await
        .unwrap();
}
