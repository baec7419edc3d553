// Integration tests for the action dispatcher
//
// Tests cover:
// - click(), fill(), select_option() delivering exactly one input
// - Strictness: several matches fail at once, zero matches wait then fail
// - Actionability waits (animation, late elements) and their timeouts
// - Trial clicks

mod common;

use autowait::driver::memory::element;
use autowait::{ClickOptions, Error, SelectOption, expect};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_click_delivers_one_input() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let counter = page.locator("#counter");
    counter.click(None).await.expect("Failed to click");
    assert_eq!(counter.text_content().await.unwrap(), Some("1".to_string()));

    page.click("#counter", None).await.expect("Failed to click");
    assert_eq!(counter.text_content().await.unwrap(), Some("2".to_string()));
}

#[tokio::test]
async fn test_fill_replaces_value_and_fires_change() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let name = page.locator("#name");
    name.fill("Ada", None).await.expect("Failed to fill");
    name.fill("Grace", None).await.expect("Failed to fill");

    assert_eq!(name.input_value().await.unwrap(), "Grace");
    assert_eq!(
        page.locator("#greeting").text_content().await.unwrap(),
        Some("Hello Grace".to_string())
    );
}

#[tokio::test]
async fn test_fill_rejects_non_editable_element() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    match page.fill("#title", "x", None).await {
        Err(Error::InvalidArgument(msg)) => {
            assert!(msg.contains("[selector: #title]"), "{msg}");
        }
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
}

#[tokio::test]
async fn test_select_option_by_value_label_and_index() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let sort = page.locator("#sort");

    let selected = sort.select_option("lohi", None).await.unwrap();
    assert_eq!(selected, vec!["lohi"]);
    assert_eq!(sort.input_value().await.unwrap(), "lohi");

    let selected = sort
        .select_option(SelectOption::Label("Name (Z to A)".to_string()), None)
        .await
        .unwrap();
    assert_eq!(selected, vec!["za"]);

    let selected = page
        .select_option("#sort", SelectOption::Index(0), None)
        .await
        .unwrap();
    assert_eq!(selected, vec!["az"]);

    let result = sort.select_option("hilo", None).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))), "{result:?}");

    let result = sort.select_option_multiple(&["az", "za"], None).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))), "{result:?}");
}

#[tokio::test]
async fn test_ambiguous_match_fails_immediately() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let start = Instant::now();
    let result = page.locator(".item .add").click(None).await;
    match result {
        Err(Error::AmbiguousMatch { selector, count }) => {
            assert_eq!(selector, ".item .add");
            assert_eq!(count, 3);
        }
        other => panic!("Expected AmbiguousMatch, got {:?}", other),
    }
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_missing_element_fails_at_deadline() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let options = ClickOptions::builder()
        .timeout(Duration::from_millis(200))
        .build();
    let start = Instant::now();
    let result = page.locator("#nope").click(Some(options)).await;

    assert!(
        matches!(result, Err(Error::AmbiguousMatch { count: 0, .. })),
        "{result:?}"
    );
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
}

#[tokio::test]
async fn test_not_actionable_reports_last_state() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let options = ClickOptions::builder()
        .timeout(Duration::from_millis(150))
        .build();

    match page.locator("#disabled").click(Some(options.clone())).await {
        Err(Error::NotActionable { selector, state, timeout }) => {
            assert_eq!(selector, "#disabled");
            assert!(state.attached && state.visible);
            assert!(!state.enabled);
            assert_eq!(timeout, Duration::from_millis(150));
        }
        other => panic!("Expected NotActionable, got {:?}", other),
    }

    match page.locator("#hidden").click(Some(options)).await {
        Err(err @ Error::NotActionable { .. }) => {
            assert!(err.is_timeout());
            assert!(err.to_string().contains("visible=false"), "{err}");
        }
        other => panic!("Expected NotActionable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_click_waits_for_animation_to_settle() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    page.click("#menu", None).await.unwrap();

    // The menu slides in for 150ms; the close button is not stable until then
    let start = Instant::now();
    page.click("#close", None).await.expect("Failed to close menu");
    assert!(start.elapsed() >= Duration::from_millis(100));

    expect(page.locator(".menu")).to_be_hidden().await.unwrap();
}

#[tokio::test]
async fn test_click_waits_for_late_element() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    driver
        .update(page.id(), |scope| {
            scope.after(Duration::from_millis(100), |scope| {
                scope.append(
                    "body",
                    element("button").id("late").text("Late").on_click(|scope| {
                        scope.set_text("#title", "Late clicked");
                    }),
                );
            });
        })
        .unwrap();

    page.click("#late", None).await.expect("Late element never clicked");
    expect(page.locator("#title"))
        .to_have_text("Late clicked")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_trial_click_does_not_dispatch() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let options = ClickOptions::builder().trial(true).build();
    page.click("#counter", Some(options)).await.unwrap();
    assert_eq!(
        page.locator("#counter").text_content().await.unwrap(),
        Some("0".to_string())
    );

    // Trial still runs the actionability checks
    let options = ClickOptions::builder()
        .trial(true)
        .timeout(Duration::from_millis(100))
        .build();
    let result = page.click("#disabled", Some(options)).await;
    assert!(matches!(result, Err(Error::NotActionable { .. })));
}

#[tokio::test]
async fn test_action_on_closed_page_fails() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    page.close().await.unwrap();
    let result = page.click("#counter", None).await;
    assert!(matches!(result, Err(Error::TargetClosed { .. })), "{result:?}");
}

#[tokio::test]
async fn test_click_with_unbounded_timeout() {
    common::init_tracing();
    let driver = common::driver();
    let (_context, page) = common::open(&driver).await;

    let options = ClickOptions::builder().timeout(Duration::MAX).build();
    page.locator("#counter").click(Some(options)).await.unwrap();
    expect(page.locator("#counter")).to_have_text("1").await.unwrap();
}
