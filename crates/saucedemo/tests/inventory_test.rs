// Inventory scenarios against the simulated store
//
// Tests cover:
// - Product listing and order
// - Cart badge following add and remove
// - Sorting by price
// - The About link in the side menu
// - Social links opening new tabs

mod common;

use common::{Suite, inventory};
use saucedemo::store::SortOrder;

#[tokio::test]
async fn test_inventory_lists_products() {
    let suite = Suite::simulated().await.unwrap();
    inventory::lists_products(&suite).await.unwrap();
}

#[tokio::test]
async fn test_inventory_cart_badge() {
    let suite = Suite::simulated().await.unwrap();
    inventory::adds_and_removes_from_cart(&suite).await.unwrap();
    assert!(suite.store.as_ref().unwrap().cart().is_empty());
}

#[tokio::test]
async fn test_inventory_sort_by_price() {
    let suite = Suite::simulated().await.unwrap();
    inventory::sorts_by_price(&suite).await.unwrap();
    assert_eq!(suite.store.as_ref().unwrap().sort_order(), SortOrder::PriceAsc);
}

#[tokio::test]
async fn test_inventory_about_link() {
    let suite = Suite::simulated().await.unwrap();
    inventory::follows_about_link(&suite).await.unwrap();
    assert_eq!(suite.page.url(), "https://saucelabs.com/");
}

#[tokio::test]
async fn test_inventory_social_links() {
    let suite = Suite::simulated().await.unwrap();
    inventory::opens_social_links_in_new_tabs(&suite).await.unwrap();
    assert_eq!(suite.context.pages(), vec![suite.page.clone()]);
}
