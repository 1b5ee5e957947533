//! Cart checkout through the payment processor
//!
//! The cart is re-checked against live inventory before anything is sent. If
//! prices or stock moved, the cart is reconciled and the user has to confirm
//! again; the request never goes out with stale totals.

use serde::Serialize;
use thiserror::Error;

use crate::cart::{Cart, CartError, CartStore, CartValidation};
use crate::catalog::{ApiError, CatalogService, DataSource};

/// Errors raised while checking out
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid email address '{0}'")]
    InvalidEmail(String),

    /// Inventory could not be confirmed against the live API
    #[error("Cannot confirm inventory while the store is unreachable (using {0} data)")]
    InventoryUnverified(DataSource),

    /// The cart was reconciled with inventory and needs confirming again
    #[error("Cart changed to match current inventory ({} issue(s)); review it and check out again", .0.issues.len())]
    CartChanged(CartValidation),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Checkout failed: {0}")]
    Api(#[from] ApiError),
}

/// One line item sent to the checkout endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLineItem {
    pub product_id: String,
    pub name: String,
    /// Unit price in cents
    pub unit_amount: u64,
    pub quantity: u32,
}

/// Body of a checkout session request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CheckoutRequest {
    /// Builds a request from the cart
    ///
    /// # Returns
    /// * `Err(CheckoutError::EmptyCart)` - If there is nothing to buy
    /// * `Err(CheckoutError::InvalidEmail)` - If an email is given but malformed
    pub fn from_cart(cart: &Cart, email: Option<&str>) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let email = match email.map(str::trim) {
            None | Some("") => None,
            Some(email) if is_valid_email(email) => Some(email.to_string()),
            Some(email) => return Err(CheckoutError::InvalidEmail(email.to_string())),
        };
        let items = cart
            .items
            .iter()
            .map(|item| CheckoutLineItem {
                product_id: item.product_id.clone(),
                name: item.name.clone(),
                unit_amount: item.unit_price_cents,
                quantity: item.quantity,
            })
            .collect();
        Ok(Self { items, email })
    }

    /// Sum of all line items in cents
    pub fn total_cents(&self) -> u64 {
        self.items.iter().fold(0u64, |sum, item| {
            sum.saturating_add(item.unit_amount.saturating_mul(u64::from(item.quantity)))
        })
    }
}

/// A payment session opened by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: String,
    /// Where the customer completes payment
    pub url: String,
}

/// Loose structural check: one `@`, non-empty local part, dotted domain, no spaces
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

/// Checks the cart against live inventory and opens a payment session
///
/// The cart is left in place: the order is confirmed by the server once payment
/// completes.
pub async fn checkout(
    catalog: &CatalogService,
    carts: &mut CartStore,
    email: Option<&str>,
) -> Result<CheckoutSession, CheckoutError> {
    // Fail fast on input problems before touching the network
    CheckoutRequest::from_cart(carts.cart(), email)?;

    let validation = carts.validate(catalog).await;
    if !validation.is_authoritative() {
        return Err(CheckoutError::InventoryUnverified(validation.source));
    }
    if !validation.is_valid() {
        carts.reconcile(&validation)?;
        tracing::info!(issues = validation.issues.len(), "Cart changed before checkout");
        return Err(CheckoutError::CartChanged(validation));
    }

    let request = CheckoutRequest::from_cart(carts.cart(), email)?;
    let session = catalog.client().create_checkout_session(&request).await?;
    tracing::info!(
        session_id = %session.session_id,
        total_cents = request.total_cents(),
        "Checkout session created"
    );
    Ok(session)
}
