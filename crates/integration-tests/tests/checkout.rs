//! Order form, both submission paths and the payment return pages.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};
use florist_core::Price;
use florist_integration_tests::{TestContext, fake_api};
use serde_json::json;

const CONTACT: [(&str, &str); 5] = [
    ("name", "Anna Petrova"),
    ("phone", "+7 999 123-45-67"),
    ("email", "anna@example.com"),
    ("address", "Nevsky prospect 1"),
    ("comment", "Ring twice"),
];

async fn signed_in_with_roses() -> TestContext {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;
    ctx.add_to_cart("1").await;
    ctx.add_to_cart("1").await;
    ctx
}

#[tokio::test]
async fn test_order_form_requires_sign_in() {
    let ctx = TestContext::new().await;
    ctx.add_to_cart("1").await;

    ctx.get("/order").await.assert_redirect("/login");
    ctx.post_form("/order", &CONTACT).await.assert_redirect("/login");
    assert!(ctx.api.requests_to(Method::POST, "/orders/").is_empty());
}

#[tokio::test]
async fn test_empty_cart_is_refused() {
    let ctx = TestContext::new().await;
    ctx.sign_in().await;

    ctx.get("/order").await.assert_redirect("/?error=empty_cart");
    ctx.post_form("/order", &CONTACT)
        .await
        .assert_redirect("/?error=empty_cart");
    ctx.post_form("/order/pay", &CONTACT)
        .await
        .assert_redirect("/?error=empty_cart");

    assert!(ctx.api.requests_to(Method::POST, "/orders/").is_empty());
    assert!(ctx.api.requests_to(Method::POST, "/checkout/").is_empty());

    let catalog = ctx.get("/?error=empty_cart").await;
    assert!(catalog.body.contains("Your cart is empty. Add some flowers"));
}

#[tokio::test]
async fn test_order_form_is_prefilled_from_profile() {
    let ctx = signed_in_with_roses().await;

    let page = ctx.get("/order").await;
    page.assert_ok();
    assert!(page.body.contains("value=\"Anna\""));
    assert!(page.body.contains("value=\"anna@example.com\""));
    assert!(page.body.contains("value=\"+7 999 123-45-67\""));
    assert!(page.body.contains("Rose &times; 2 = 1000 ₽"));
}

#[tokio::test]
async fn test_missing_fields_never_reach_the_api() {
    let ctx = signed_in_with_roses().await;

    let page = ctx
        .post_form(
            "/order",
            &[
                ("name", "Anna"),
                ("phone", "  "),
                ("email", "not-an-email"),
                ("address", ""),
            ],
        )
        .await;

    page.assert_ok();
    assert_eq!(page.body.matches("This field is required").count(), 2);
    assert!(page.body.contains("Enter a valid email address"));
    assert!(page.body.contains("value=\"not-an-email\""));
    assert!(ctx.api.requests_to(Method::POST, "/orders/").is_empty());
}

#[tokio::test]
async fn test_direct_order_clears_cart() {
    let ctx = signed_in_with_roses().await;

    let page = ctx.post_form("/order", &CONTACT).await;
    page.assert_ok();
    assert!(page.body.contains("content=\"2;url=/\""));
    assert!(page.body.contains("Order #100"));

    let sent = ctx.api.requests_to(Method::POST, "/orders/");
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].authorization.as_deref(),
        Some(format!("Bearer {}", fake_api::ACCESS_TOKEN).as_str())
    );

    let body = sent[0].body.clone().unwrap();
    assert_eq!(body["name"], "Anna Petrova");
    assert_eq!(body["comment"], "Ring twice");
    assert_eq!(body["items"][0]["id"], 1);
    assert_eq!(body["items"][0]["name"], "Rose");
    assert_eq!(body["items"][0]["quantity"], 2);
    let total: Price = serde_json::from_value(body["total"].clone()).unwrap();
    assert_eq!(total, Price::from_rubles(1000));

    let cart = ctx.get("/cart").await;
    assert!(cart.body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_direct_order_failure_keeps_form_and_cart() {
    let ctx = signed_in_with_roses().await;
    ctx.api.fail_orders(
        StatusCode::BAD_REQUEST,
        json!({"detail": "Rose is out of stock"}),
    );

    let page = ctx.post_form("/order", &CONTACT).await;
    page.assert_ok();
    assert!(page.body.contains("Error: Rose is out of stock"));
    assert!(page.body.contains("Nevsky prospect 1"));

    let cart = ctx.get("/cart").await;
    assert!(cart.body.contains("Total: 1000 ₽"));
}

#[tokio::test]
async fn test_direct_order_failure_without_message() {
    let ctx = signed_in_with_roses().await;
    ctx.api
        .fail_orders(StatusCode::INTERNAL_SERVER_ERROR, json!("Server Error"));

    let page = ctx.post_form("/order", &CONTACT).await;
    assert!(page.body.contains("Error: Could not place the order"));
}

#[tokio::test]
async fn test_pay_online_redirects_to_checkout_url_verbatim() {
    let ctx = signed_in_with_roses().await;

    let response = ctx.post_form("/order/pay", &CONTACT).await;
    response.assert_redirect(fake_api::CHECKOUT_URL);

    assert!(ctx.api.requests_to(Method::POST, "/orders/").is_empty());
    let sent = ctx.api.requests_to(Method::POST, "/checkout/");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body.as_ref().unwrap()["address"], "Nevsky prospect 1");
}

#[tokio::test]
async fn test_pay_online_failure_shows_provider_error() {
    let ctx = signed_in_with_roses().await;
    ctx.api.fail_checkout(
        StatusCode::BAD_REQUEST,
        json!({"error": "Payment provider unavailable"}),
    );

    let page = ctx.post_form("/order/pay", &CONTACT).await;
    page.assert_ok();
    assert!(page.body.contains("Error: Payment provider unavailable"));

    ctx.api
        .fail_checkout(StatusCode::BAD_GATEWAY, json!({"unexpected": true}));
    let page = ctx.post_form("/order/pay", &CONTACT).await;
    assert!(page.body.contains("Error: Could not create the payment"));
}

#[tokio::test]
async fn test_payment_return_paid() {
    let ctx = TestContext::new().await;

    let page = ctx.get("/order-success?session_id=cs_test_a1b2c3").await;
    page.assert_ok();
    assert!(page.body.contains("Payment successful!"));
    assert_eq!(
        ctx.api
            .requests_to(Method::GET, "/payment-status/cs_test_a1b2c3/")
            .len(),
        1
    );
}

#[tokio::test]
async fn test_payment_return_only_paid_counts() {
    let ctx = TestContext::new().await;

    for status in ["unpaid", "no_payment_required", "expired"] {
        ctx.api.set_payment_status(status);
        let page = ctx.get("/order-success?session_id=cs_test_a1b2c3").await;
        page.assert_ok();
        assert!(page.body.contains("Payment failed"), "status {status}");
    }
}

#[tokio::test]
async fn test_payment_return_without_session_id() {
    let ctx = TestContext::new().await;

    let page = ctx.get("/order-success").await;
    page.assert_ok();
    assert!(page.body.contains("Payment failed"));
    assert!(ctx.api.requests().is_empty());
}

#[tokio::test]
async fn test_payment_cancel_page() {
    let ctx = TestContext::new().await;
    ctx.get("/order-cancel").await.assert_ok();
}
