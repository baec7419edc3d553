// Integration tests for navigation tracking
//
// Tests cover:
// - wait_for_url() when the navigation already committed
// - wait_for_url() for a navigation that commits later
// - Glob, substring and regex patterns
// - NavigationTimeout carrying the last URL
// - goto() with relative URLs and load-state waits
// - Duration::MAX as an unbounded timeout

mod common;

use autowait::{Error, LoadState, UrlPattern};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_wait_for_url_already_there() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let start = Instant::now();
    page.wait_for_url(common::HOME, None).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));
    assert_eq!(page.url(), common::HOME);
}

#[tokio::test]
async fn test_wait_for_url_after_click() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    page.click("#next", None).await.unwrap();
    // The click returns before the navigation commits
    assert_eq!(page.url(), common::HOME);

    page.wait_for_url("**/next.html", None).await.unwrap();
    assert_eq!(page.url(), common::NEXT);

    // Already committed: every pattern kind matches immediately
    page.wait_for_url(UrlPattern::contains("next"), None)
        .await
        .unwrap();
    page.wait_for_url(UrlPattern::regex(r"/next\.html$").unwrap(), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_wait_for_url_timeout() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let start = Instant::now();
    let result = page
        .wait_for_url("**/cart.html", Some(Duration::from_millis(150)))
        .await;
    assert!(start.elapsed() >= Duration::from_millis(150));

    match result {
        Err(Error::NavigationTimeout {
            pattern,
            last_url,
            timeout,
        }) => {
            assert_eq!(pattern, "matching glob '**/cart.html'");
            assert_eq!(last_url, common::HOME);
            assert_eq!(timeout, Duration::from_millis(150));
        }
        other => panic!("Expected NavigationTimeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_goto_relative_url_and_load_state() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    page.goto("/next.html").await.unwrap();
    assert_eq!(page.url(), common::NEXT);

    page.wait_for_load_state(None, None).await.unwrap();
    page.wait_for_load_state(Some(LoadState::DomContentLoaded), None)
        .await
        .unwrap();

    page.goto(common::HOME).await.unwrap();
    assert_eq!(page.locator(".item").count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_navigation_replaces_document() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let title = page.locator("#title");
    assert_eq!(title.inner_text().await.unwrap(), "Welcome\n  home");

    page.click("#next", None).await.unwrap();
    page.wait_for_url(common::NEXT, None).await.unwrap();

    // Same locator, new document
    assert_eq!(title.inner_text().await.unwrap(), "Next page");
    assert_eq!(page.locator(".item").count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_wait_for_url_on_closed_page() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let waiter = {
        let page = page.clone();
        tokio::spawn(async move { page.wait_for_url("**/never.html", None).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    page.close().await.unwrap();

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(Error::TargetClosed { .. })), "{result:?}");
}

#[tokio::test]
async fn test_waits_with_unbounded_timeout() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    page.wait_for_url(common::HOME, Some(Duration::MAX)).await.unwrap();
    page.wait_for_load_state(Some(LoadState::Load), Some(Duration::MAX)).await.unwrap();
}
