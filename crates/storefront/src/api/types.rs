//! Request and response bodies of the flower API.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use florist_core::{
    CartLine, FavoriteId, Flower, FlowerId, OrderId, OrderStatus, PaymentStatus, Price, UserId,
};

// =============================================================================
// Accounts
// =============================================================================

/// A registered shop user, as returned by login, register and profile calls.
///
/// Also kept in the visitor session so pages can greet the user without a
/// round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

impl User {
    /// First name when set, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.first_name.trim().is_empty() {
            &self.username
        } else {
            &self.first_name
        }
    }

    /// Phone number from the profile, if any.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.phone.as_deref())
            .filter(|p| !p.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub phone: Option<String>,
}

/// Token pair issued on login and registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

/// Body of a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: AuthTokens,
}

/// Body of a successful token refresh. The refresh token is rotated on
/// every use, so a new one usually comes back too.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: &'a str,
    pub password2: &'a str,
    pub phone: &'a str,
}

// =============================================================================
// Orders and payments
// =============================================================================

/// Contact details plus a snapshot of the cart, sent both for direct orders
/// and for hosted checkout sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub comment: String,
    pub items: Vec<CartLine>,
    pub total: Price,
}

/// A placed order.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub items: Vec<CartLine>,
    pub total: Price,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

/// Hosted checkout session created for an order.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

/// Result of polling a hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusResponse {
    pub status: PaymentStatus,
    #[serde(default)]
    pub order_status: Option<OrderStatus>,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

// =============================================================================
// Favorites
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Favorite {
    pub id: FavoriteId,
    pub flower: Flower,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Serialize)]
pub struct AddFavoriteRequest {
    pub flower_id: FlowerId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_order_items_parse_flattened_lines() {
        let json = r#"{
            "id": 12,
            "name": "Anna",
            "phone": "+7",
            "email": "anna@example.com",
            "address": "Main st. 1",
            "comment": "",
            "items": [{"id": 1, "name": "Rose", "description": "", "price": "500.00", "quantity": 2}],
            "total": "1000.00",
            "status": "pending",
            "created_at": "2025-03-08T10:15:00.123456+03:00"
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].flower.price, Price::from_rubles(500));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_payment_status_unknown_value() {
        let body: PaymentStatusResponse =
            serde_json::from_str(r#"{"status": "expired", "order_status": "pending", "order_id": 3}"#)
                .unwrap();
        assert!(!body.status.is_paid());
    }

    #[test]
    fn test_user_display_name_falls_back_to_username() {
        let user: User = serde_json::from_str(r#"{"id": 1, "username": "anna"}"#).unwrap();
        assert_eq!(user.display_name(), "anna");
        assert!(user.phone().is_none());
    }

    #[test]
    fn test_add_favorite_body() {
        let body = serde_json::to_value(AddFavoriteRequest {
            flower_id: FlowerId::new(4),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"flower_id": 4}));
    }
}
