//! Cart behaviour through the cart pages.
//!
//! The cart lives in the session, so these tests need no sign-in; the API is
//! only consulted to snapshot the flower being added.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use florist_integration_tests::TestContext;

#[tokio::test]
async fn test_adding_twice_merges_into_one_line() {
    let ctx = TestContext::new().await;

    ctx.add_to_cart("1").await.assert_redirect("/");
    ctx.add_to_cart("1").await.assert_redirect("/");

    let cart = ctx.get("/cart").await;
    cart.assert_ok();
    assert_eq!(cart.body.matches("action=\"/cart/update\"").count(), 1);
    assert!(cart.body.contains("value=\"2\""));
    assert!(cart.body.contains("Total: 1000 ₽"));
    assert!(cart.body.contains("<span class=\"badge\">2</span>"));
}

#[tokio::test]
async fn test_badge_counts_units_across_lines() {
    let ctx = TestContext::new().await;

    ctx.add_to_cart("1").await;
    ctx.add_to_cart("2").await;
    ctx.add_to_cart("2").await;

    let catalog = ctx.get("/").await;
    catalog.assert_ok();
    assert!(catalog.body.contains("<span class=\"badge\">3</span>"));

    let cart = ctx.get("/cart").await;
    // Rose 500 + 2 x Tulip 120
    assert!(cart.body.contains("Total: 740 ₽"));
}

#[tokio::test]
async fn test_add_returns_to_the_given_local_page() {
    let ctx = TestContext::new().await;

    ctx.post_form("/cart/add", &[("flower_id", "3"), ("redirect_to", "/flowers/3")])
        .await
        .assert_redirect("/flowers/3");

    ctx.post_form(
        "/cart/add",
        &[("flower_id", "3"), ("redirect_to", "https://evil.example.com/")],
    )
    .await
    .assert_redirect("/");
}

#[tokio::test]
async fn test_fractional_prices_keep_kopecks() {
    let ctx = TestContext::new().await;

    ctx.add_to_cart("3").await;

    let cart = ctx.get("/cart").await;
    assert!(cart.body.contains("Total: 249.50 ₽"));
}

#[tokio::test]
async fn test_update_sets_quantity_and_ignores_junk() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("1").await;

    ctx.post_form("/cart/update", &[("flower_id", "1"), ("quantity", "5")])
        .await
        .assert_redirect("/cart");
    assert!(ctx.get("/cart").await.body.contains("Total: 2500 ₽"));

    for quantity in ["0", "-3", "many", ""] {
        ctx.post_form("/cart/update", &[("flower_id", "1"), ("quantity", quantity)])
            .await
            .assert_redirect("/cart");
    }
    assert!(ctx.get("/cart").await.body.contains("Total: 2500 ₽"));

    // Unknown line
    ctx.post_form("/cart/update", &[("flower_id", "2"), ("quantity", "4")])
        .await
        .assert_redirect("/cart");
    assert!(!ctx.get("/cart").await.body.contains("Tulip"));
}

#[tokio::test]
async fn test_remove_and_clear() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("1").await;
    ctx.add_to_cart("2").await;

    ctx.post_form("/cart/remove", &[("flower_id", "1")])
        .await
        .assert_redirect("/cart");
    let cart = ctx.get("/cart").await;
    assert!(!cart.body.contains("<strong>Rose</strong>"));
    assert!(cart.body.contains("<strong>Tulip</strong>"));

    ctx.post_form("/cart/clear", &[]).await.assert_redirect("/cart");
    let cart = ctx.get("/cart").await;
    assert!(cart.body.contains("Your cart is empty"));
    assert!(!cart.body.contains("class=\"badge\""));
}

#[tokio::test]
async fn test_unknown_flower_is_reported() {
    let ctx = TestContext::new().await;

    ctx.add_to_cart("404")
        .await
        .assert_redirect("/?error=flower_unavailable");

    let catalog = ctx.get("/?error=flower_unavailable").await;
    assert!(catalog.body.contains("That flower is no longer available."));
    assert!(ctx.get("/cart").await.body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_anonymous_calls_carry_no_token() {
    let ctx = TestContext::new().await;

    ctx.get("/").await.assert_ok();
    ctx.add_to_cart("1").await;

    let requests = ctx.api.requests();
    assert!(!requests.is_empty());
    assert!(requests.iter().all(|r| r.authorization.is_none()));
    assert_eq!(ctx.api.requests_to(Method::GET, "/flowers/1/").len(), 1);
}

#[tokio::test]
async fn test_flower_page() {
    let ctx = TestContext::new().await;

    let page = ctx.get("/flowers/2").await;
    page.assert_ok();
    assert!(page.body.contains("Tulip"));
    assert!(page.body.contains("120 ₽"));
    assert!(page.body.contains("http://media.example.com/flowers/2.jpg"));

    assert_eq!(ctx.get("/flowers/404").await.status, StatusCode::NOT_FOUND);
}
