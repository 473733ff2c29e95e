//! Order history, re-order, pay-later and favorites.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};
use florist_integration_tests::{TestContext, fake_api};
use serde_json::json;

#[tokio::test]
async fn test_profile_lists_orders_with_pay_button_for_pending_only() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;

    let page = ctx.get("/profile").await;
    page.assert_ok();
    assert!(page.body.contains("Order history (3)"));
    assert!(page.body.contains("status-pending"));
    assert!(page.body.contains("Awaiting processing"));
    assert!(page.body.contains("Date: 08.03.2025"));
    assert!(page.body.contains("Total: 1120 ₽"));
    assert!(page.body.contains("action=\"/profile/orders/7/pay\""));
    assert!(!page.body.contains("action=\"/profile/orders/8/pay\""));
}

#[tokio::test]
async fn test_reorder_adds_lines_to_cart() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;
    ctx.add_to_cart("1").await;

    ctx.post_form(&format!("/profile/orders/{}/reorder", fake_api::PENDING_ORDER), &[])
        .await
        .assert_redirect("/cart");

    // Existing rose + 2 roses + 1 tulip from the order
    let cart = ctx.get("/cart").await;
    assert!(cart.body.contains("Total: 1620 ₽"));
    assert!(cart.body.contains("<span class=\"badge\">4</span>"));
}

#[tokio::test]
async fn test_reorder_unknown_order() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;

    let response = ctx.post_form("/profile/orders/55/reorder", &[]).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pay_pending_order() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;

    ctx.post_form(&format!("/profile/orders/{}/pay", fake_api::PENDING_ORDER), &[])
        .await
        .assert_redirect(fake_api::CHECKOUT_URL);

    let sent = ctx.api.requests_to(Method::POST, "/checkout/");
    assert_eq!(sent.len(), 1);
    let body = sent[0].body.clone().unwrap();
    assert_eq!(body["address"], "Nevsky prospect 1");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_pay_refuses_settled_orders() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;

    let response = ctx
        .post_form(&format!("/profile/orders/{}/pay", fake_api::COMPLETED_ORDER), &[])
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(ctx.api.requests_to(Method::POST, "/checkout/").is_empty());
}

#[tokio::test]
async fn test_pay_order_without_address() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;

    ctx.post_form(
        &format!("/profile/orders/{}/pay", fake_api::ORDER_WITHOUT_ADDRESS),
        &[],
    )
    .await
    .assert_redirect("/profile?error=missing_contact");
    assert!(ctx.api.requests_to(Method::POST, "/checkout/").is_empty());

    let page = ctx.get("/profile?error=missing_contact").await;
    assert!(page.body.contains("The order is missing contact details."));
}

#[tokio::test]
async fn test_pay_failure_is_shown_on_profile() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;
    ctx.api.fail_checkout(
        StatusCode::BAD_REQUEST,
        json!({"error": "Order already paid"}),
    );

    let page = ctx
        .post_form(&format!("/profile/orders/{}/pay", fake_api::PENDING_ORDER), &[])
        .await;
    page.assert_ok();
    assert!(page.body.contains("Error: Order already paid"));
}

#[tokio::test]
async fn test_favorite_toggle_requires_sign_in() {
    let ctx = TestContext::new().await;

    ctx.post_form("/favorites/toggle", &[("flower_id", "1"), ("redirect_to", "/")])
        .await
        .assert_redirect("/?error=login_required");
    assert!(ctx.api.requests().is_empty());
}

#[tokio::test]
async fn test_favorite_toggle_adds_and_removes() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;

    ctx.post_form(
        "/favorites/toggle",
        &[("flower_id", "2"), ("redirect_to", "/flowers/2")],
    )
    .await
    .assert_redirect("/flowers/2");

    let sent = ctx.api.requests_to(Method::POST, "/favorites/");
    assert_eq!(sent[0].body, Some(json!({"flower_id": 2})));
    assert_eq!(ctx.api.favorite_flower_ids(), vec![2]);

    let page = ctx.get("/flowers/2").await;
    assert!(page.body.contains("In favorites"));

    let profile = ctx.get("/profile?tab=favorites").await;
    assert!(profile.body.contains("Favorites (1)"));
    assert!(profile.body.contains("Tulip"));

    ctx.post_form("/favorites/toggle", &[("flower_id", "2"), ("redirect_to", "/")])
        .await
        .assert_redirect("/");
    assert!(ctx.api.favorite_flower_ids().is_empty());
    assert!(ctx.get("/flowers/2").await.body.contains("Add to favorites"));
}

#[tokio::test]
async fn test_remove_favorite_from_profile() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;
    ctx.post_form("/favorites/toggle", &[("flower_id", "1"), ("redirect_to", "/")])
        .await;

    ctx.post_form("/profile/favorites/1/remove", &[])
        .await
        .assert_redirect("/profile?tab=favorites");
    assert!(ctx.api.favorite_flower_ids().is_empty());

    let profile = ctx.get("/profile?tab=favorites").await;
    assert!(profile.body.contains("You have no favorite flowers yet."));

    ctx.post_form("/profile/favorites/1/remove", &[])
        .await
        .assert_redirect("/profile?tab=favorites&error=favorite_failed");
}
