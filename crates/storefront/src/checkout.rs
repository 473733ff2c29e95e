//! Checkout state machine.
//!
//! ```text
//!            begin (valid)              submit ok
//! Editing ────────────────> Submitting ───────────> Succeeded
//!    ^   begin (invalid)        │
//!    └───────┘                  │ submit err
//!    ^                          v
//!    └──────── recover ────── Failed
//! ```
//!
//! `begin` never touches the network: an empty cart is refused outright and
//! an incomplete form stays in `Editing` with per-field errors. Only a
//! `Submitting` phase calls the API, through one of two paths:
//!
//! - [`SubmitMode::Direct`] places the order without payment (`POST /orders/`)
//! - [`SubmitMode::PayOnline`] opens a hosted checkout session
//!   (`POST /checkout/`) whose URL the visitor is sent to verbatim

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use florist_core::{Cart, Email, OrderId};

use crate::api::{ApiClient, ApiError, Order, OrderRequest, TokenStore, User};

/// Seconds the order confirmation stays on screen before returning to the catalog.
pub const ORDER_REDIRECT_SECONDS: u64 = 2;

const DIRECT_ERROR_KEYS: &[&str] = &["detail", "message"];
const HOSTED_ERROR_KEYS: &[&str] = &["error", "message"];
const DIRECT_DEFAULT_ERROR: &str = "Could not place the order";
const HOSTED_DEFAULT_ERROR: &str = "Could not create the payment";

/// Errors that stop a checkout before any form handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// Nothing to order.
    #[error("The cart is empty")]
    EmptyCart,

    /// A stored order lacks the contact details a payment needs.
    #[error("The order is missing contact details")]
    MissingContact,
}

/// Contact details entered on the order form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckoutForm {
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
}

/// Per-field validation messages; `None` means the field is fine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub name: Option<&'static str>,
    pub phone: Option<&'static str>,
    pub email: Option<&'static str>,
    pub address: Option<&'static str>,
}

impl FieldErrors {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.email.is_none() && self.address.is_none()
    }
}

fn required(value: &str) -> Option<&'static str> {
    value.trim().is_empty().then_some("This field is required")
}

impl CheckoutForm {
    /// Check required fields and the email format.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        FieldErrors {
            name: required(&self.name),
            phone: required(&self.phone),
            email: required(&self.email)
                .or_else(|| Email::parse(&self.email).err().map(|_| "Enter a valid email address")),
            address: required(&self.address),
        }
    }

    fn into_request(self, cart: &Cart) -> OrderRequest {
        OrderRequest {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            address: self.address.trim().to_string(),
            comment: self.comment.trim().to_string(),
            items: cart.lines().to_vec(),
            total: cart.total(),
        }
    }
}

impl From<&OrderRequest> for CheckoutForm {
    fn from(draft: &OrderRequest) -> Self {
        Self {
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            address: draft.address.clone(),
            comment: draft.comment.clone(),
        }
    }
}

/// Which of the two submission paths to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Create the order, no payment.
    Direct,
    /// Create a hosted checkout session and redirect to it.
    PayOnline,
}

impl SubmitMode {
    fn error_keys(self) -> &'static [&'static str] {
        match self {
            Self::Direct => DIRECT_ERROR_KEYS,
            Self::PayOnline => HOSTED_ERROR_KEYS,
        }
    }

    fn default_error(self) -> &'static str {
        match self {
            Self::Direct => DIRECT_DEFAULT_ERROR,
            Self::PayOnline => HOSTED_DEFAULT_ERROR,
        }
    }

    /// The message shown to the visitor for a failed submission.
    #[must_use]
    pub fn failure_message(self, err: &ApiError) -> String {
        let message = err
            .user_message(self.error_keys())
            .unwrap_or_else(|| self.default_error().to_string());
        format!("Error: {message}")
    }
}

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Order created; the cart must be cleared.
    Placed { order_id: OrderId },
    /// Payment page to send the visitor to.
    Redirect { checkout_url: String },
}

/// Phases of one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutPhase {
    Editing {
        form: CheckoutForm,
        errors: FieldErrors,
        alert: Option<String>,
    },
    Submitting {
        draft: OrderRequest,
        mode: SubmitMode,
    },
    Succeeded(CheckoutOutcome),
    Failed {
        form: CheckoutForm,
        message: String,
    },
}

impl CheckoutPhase {
    /// Leave `Editing`: validate the form against the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] when there is nothing to order.
    pub fn begin(cart: &Cart, form: CheckoutForm, mode: SubmitMode) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let errors = form.validate();
        if !errors.is_empty() {
            return Ok(Self::Editing {
                form,
                errors,
                alert: None,
            });
        }

        Ok(Self::Submitting {
            draft: form.into_request(cart),
            mode,
        })
    }

    /// Send a `Submitting` phase to the API. Other phases are returned as is.
    #[instrument(skip_all)]
    pub async fn submit(self, api: &ApiClient, tokens: &TokenStore) -> Self {
        let Self::Submitting { draft, mode } = self else {
            return self;
        };

        let result = match mode {
            SubmitMode::Direct => api
                .create_order(&draft, tokens)
                .await
                .map(|order| CheckoutOutcome::Placed { order_id: order.id }),
            SubmitMode::PayOnline => api
                .create_checkout(&draft, tokens)
                .await
                .map(|session| CheckoutOutcome::Redirect {
                    checkout_url: session.checkout_url,
                }),
        };

        match result {
            Ok(outcome) => {
                tracing::info!(?mode, ?outcome, "Checkout submitted");
                Self::Succeeded(outcome)
            }
            Err(e) => {
                tracing::warn!(?mode, error = %e, "Checkout submission failed");
                Self::Failed {
                    form: CheckoutForm::from(&draft),
                    message: mode.failure_message(&e),
                }
            }
        }
    }

    /// Return from `Failed` to `Editing`, keeping the entered data and
    /// surfacing the failure as an alert.
    #[must_use]
    pub fn recover(self) -> Self {
        match self {
            Self::Failed { form, message } => Self::Editing {
                form,
                errors: FieldErrors::default(),
                alert: Some(message),
            },
            other => other,
        }
    }
}

/// Build a checkout request for paying an existing pending order.
///
/// Missing contact fields on the order are filled from the user's profile.
///
/// # Errors
///
/// Returns [`CheckoutError::MissingContact`] when name, email or address
/// remain empty.
pub fn pay_later_request(order: &Order, user: &User) -> Result<OrderRequest, CheckoutError> {
    let or_else = |value: &str, fallback: &str| {
        let value = value.trim();
        if value.is_empty() {
            fallback.trim().to_string()
        } else {
            value.to_string()
        }
    };

    let request = OrderRequest {
        name: or_else(&order.name, user.display_name()),
        phone: or_else(&order.phone, user.phone().unwrap_or_default()),
        email: or_else(&order.email, &user.email),
        address: order.address.trim().to_string(),
        comment: order.comment.clone(),
        items: order.items.clone(),
        total: order.total,
    };

    if request.name.is_empty() || request.email.is_empty() || request.address.is_empty() {
        return Err(CheckoutError::MissingContact);
    }
    Ok(request)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use florist_core::{Flower, FlowerId, OrderStatus, Price};

    use super::*;

    fn rose_cart() -> Cart {
        let mut cart = Cart::default();
        cart.add_quantity(
            Flower {
                id: FlowerId::new(1),
                name: "Rose".to_string(),
                description: String::new(),
                price: Price::from_rubles(500),
                image: None,
                image_url: None,
                category: None,
                in_stock: true,
            },
            2,
        );
        cart
    }

    fn filled_form() -> CheckoutForm {
        CheckoutForm {
            name: "Anna".to_string(),
            phone: "+7 900 000 00 00".to_string(),
            email: "anna@example.com".to_string(),
            address: "Main st. 1".to_string(),
            comment: String::new(),
        }
    }

    #[test]
    fn test_empty_cart_is_refused() {
        let err = CheckoutPhase::begin(&Cart::default(), filled_form(), SubmitMode::Direct);
        assert_eq!(err, Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn test_missing_field_stays_editing() {
        let form = CheckoutForm {
            address: "   ".to_string(),
            ..filled_form()
        };
        let phase = CheckoutPhase::begin(&rose_cart(), form, SubmitMode::Direct).unwrap();

        let CheckoutPhase::Editing { errors, .. } = phase else {
            panic!("expected Editing, got {phase:?}");
        };
        assert!(errors.address.is_some());
        assert!(errors.name.is_none());
    }

    #[test]
    fn test_malformed_email_stays_editing() {
        let form = CheckoutForm {
            email: "anna.example.com".to_string(),
            ..filled_form()
        };
        let phase = CheckoutPhase::begin(&rose_cart(), form, SubmitMode::PayOnline).unwrap();
        assert!(matches!(phase, CheckoutPhase::Editing { errors, .. } if errors.email.is_some()));
    }

    #[test]
    fn test_valid_form_snapshots_cart() {
        let phase = CheckoutPhase::begin(&rose_cart(), filled_form(), SubmitMode::Direct).unwrap();

        let CheckoutPhase::Submitting { draft, mode } = phase else {
            panic!("expected Submitting");
        };
        assert_eq!(mode, SubmitMode::Direct);
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.total, Price::from_rubles(1000));
        assert_eq!(draft.name, "Anna");
    }

    #[test]
    fn test_failure_messages_follow_path_keys() {
        let err = ApiError::Status {
            status: 400,
            body: r#"{"detail": "Out of stock", "error": "Stripe is down"}"#.to_string(),
        };
        assert_eq!(SubmitMode::Direct.failure_message(&err), "Error: Out of stock");
        assert_eq!(SubmitMode::PayOnline.failure_message(&err), "Error: Stripe is down");

        let err = ApiError::NotFound("/api/orders/".to_string());
        assert_eq!(
            SubmitMode::Direct.failure_message(&err),
            format!("Error: {DIRECT_DEFAULT_ERROR}")
        );
    }

    #[test]
    fn test_recover_returns_to_editing_with_alert() {
        let failed = CheckoutPhase::Failed {
            form: filled_form(),
            message: "Error: nope".to_string(),
        };
        let CheckoutPhase::Editing { form, alert, .. } = failed.recover() else {
            panic!("expected Editing");
        };
        assert_eq!(form, filled_form());
        assert_eq!(alert.as_deref(), Some("Error: nope"));
    }

    fn pending_order(name: &str, email: &str, address: &str) -> Order {
        Order {
            id: OrderId::new(9),
            name: name.to_string(),
            phone: String::new(),
            email: email.to_string(),
            address: address.to_string(),
            comment: String::new(),
            items: rose_cart().lines().to_vec(),
            total: Price::from_rubles(1000),
            status: OrderStatus::Pending,
            created_at: None,
        }
    }

    fn user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "username": "anna",
            "email": "anna@example.com",
            "first_name": "Anna",
            "profile": {"phone": "+7 911"}
        }))
        .unwrap()
    }

    #[test]
    fn test_pay_later_fills_from_profile() {
        let request = pay_later_request(&pending_order("", "", "Main st. 1"), &user()).unwrap();

        assert_eq!(request.name, "Anna");
        assert_eq!(request.email, "anna@example.com");
        assert_eq!(request.phone, "+7 911");
        assert_eq!(request.total, Price::from_rubles(1000));
    }

    #[test]
    fn test_pay_later_without_address_is_rejected() {
        let err = pay_later_request(&pending_order("Anna", "a@b.c", ""), &user()).unwrap_err();
        assert_eq!(err, CheckoutError::MissingContact);

        let mut no_email = user();
        no_email.email = String::new();
        let err = pay_later_request(&pending_order("Anna", "", "Main st. 1"), &no_email).unwrap_err();
        assert_eq!(err, CheckoutError::MissingContact);
    }
}
