//! Shopping cart
//!
//! The cart is a list of line items persisted to the durable key-value store.
//! It can be checked against live inventory and reconciled when prices or stock
//! have moved since items were added.

mod reconcile;
mod store;

pub use reconcile::{CartIssue, CartValidation, IssueKind};
pub use store::{CartStore, CART_KEY};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::storage::StorageError;

/// Most units of a single product one cart may hold
pub const MAX_QUANTITY_PER_ITEM: u32 = 99;

/// Errors raised by cart operations
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity outside `1..=MAX_QUANTITY_PER_ITEM`
    #[error("Quantity must be between 1 and {max}, got {quantity}")]
    InvalidQuantity { quantity: u32, max: u32 },

    /// Product is inactive or has no stock
    #[error("'{0}' is not available for purchase")]
    Unavailable(String),

    /// Requested more units than are in stock
    #[error("Only {available} of '{name}' in stock")]
    InsufficientStock { name: String, available: u32 },

    /// No line for the given product id
    #[error("'{0}' is not in the cart")]
    NotInCart(String),

    /// Cart could not be persisted
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One line of the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    /// Unit price when the line was last confirmed, in cents
    pub unit_price_cents: u64,
    pub quantity: u32,
    pub image_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Price of the whole line in cents
    pub fn line_total_cents(&self) -> u64 {
        self.unit_price_cents.saturating_mul(u64::from(self.quantity))
    }
}

/// The cart contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

fn check_quantity(quantity: u32) -> Result<(), CartError> {
    if quantity == 0 || quantity > MAX_QUANTITY_PER_ITEM {
        return Err(CartError::InvalidQuantity {
            quantity,
            max: MAX_QUANTITY_PER_ITEM,
        });
    }
    Ok(())
}

impl Cart {
    /// Adds `quantity` units of `product`, merging with an existing line
    ///
    /// Fails if the product is unavailable, or if the merged quantity exceeds the
    /// per-item limit or the product's stock.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<&CartItem, CartError> {
        check_quantity(quantity)?;
        if !product.is_available() {
            return Err(CartError::Unavailable(product.name.clone()));
        }

        let existing = self.position(&product.id);
        let current = existing.map_or(0, |i| self.items[i].quantity);
        let total = current.saturating_add(quantity);
        check_quantity(total)?;
        if total > product.inventory {
            return Err(CartError::InsufficientStock {
                name: product.name.clone(),
                available: product.inventory,
            });
        }

        let index = match existing {
            Some(i) => {
                let item = &mut self.items[i];
                item.quantity = total;
                item.unit_price_cents = product.price_cents;
                item.name = product.name.clone();
                i
            }
            None => {
                self.items.push(CartItem {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    unit_price_cents: product.price_cents,
                    quantity,
                    image_url: product.image_url.clone(),
                    added_at: Utc::now(),
                });
                self.items.len() - 1
            }
        };
        self.touch();
        Ok(&self.items[index])
    }

    /// Removes the line for `product_id`
    pub fn remove(&mut self, product_id: &str) -> Result<CartItem, CartError> {
        let index = self
            .position(product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.to_string()))?;
        self.touch();
        Ok(self.items.remove(index))
    }

    /// Sets the quantity of an existing line; zero removes it
    ///
    /// Stock is not checked here; that happens on validation against live inventory.
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(product_id).map(|_| ());
        }
        check_quantity(quantity)?;
        let index = self
            .position(product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.to_string()))?;
        self.items[index].quantity = quantity;
        self.touch();
        Ok(())
    }

    /// Empties the cart
    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
    }

    /// Line for `product_id`, if any
    pub fn get(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Total units across all lines
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of all line totals in cents
    pub fn subtotal_cents(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |sum, item| sum.saturating_add(item.line_total_cents()))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Product ids of every line
    pub fn product_ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.product_id.clone()).collect()
    }

    /// Drops zero-quantity lines and clamps the rest to the per-item limit
    ///
    /// Lines built through [`Cart::add`] always satisfy this; a cart read back
    /// from storage may not. Returns how many lines changed.
    pub fn normalize_quantities(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.quantity > 0);
        let mut changed = before - self.items.len();
        for item in &mut self.items {
            if item.quantity > MAX_QUANTITY_PER_ITEM {
                item.quantity = MAX_QUANTITY_PER_ITEM;
                changed += 1;
            }
        }
        if changed > 0 {
            self.touch();
        }
        changed
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.product_id == product_id)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(id: &str, price_cents: u64, inventory: u32) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            description: String::new(),
            price_cents,
            category: "general".to_string(),
            image_url: None,
            inventory,
            is_active: true,
        }
    }

    #[test]
    fn test_normalize_quantities() {
        let mut cart = Cart::default();
        cart.add(&product("tee", 2500, 10), 2).unwrap();
        cart.add(&product("mug", 1600, 10), 1).unwrap();
        cart.add(&product("pin", 500, 10), 1).unwrap();
        cart.items[1].quantity = 0;
        cart.items[2].quantity = 500;

        assert_eq!(cart.normalize_quantities(), 2);
        assert_eq!(cart.product_ids(), vec!["tee", "pin"]);
        assert_eq!(cart.get("pin").unwrap().quantity, MAX_QUANTITY_PER_ITEM);
        assert_eq!(cart.normalize_quantities(), 0);
    }

    #[test]
    fn test_add_new_line() {
        let mut cart = Cart::default();
        let item = cart.add(&product("tee", 2500, 10), 2).unwrap();

        assert_eq!(item.quantity, 2);
        assert_eq!(item.unit_price_cents, 2500);
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn test_add_merges_existing_line() {
        let mut cart = Cart::default();
        let tee = product("tee", 2500, 10);
        cart.add(&tee, 2).unwrap();
        cart.add(&tee, 3).unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.get("tee").unwrap().quantity, 5);
    }

    #[test]
    fn test_add_rejects_zero_and_excessive_quantity() {
        let mut cart = Cart::default();
        let tee = product("tee", 2500, 500);

        assert!(matches!(cart.add(&tee, 0), Err(CartError::InvalidQuantity { .. })));
        assert!(matches!(cart.add(&tee, 100), Err(CartError::InvalidQuantity { .. })));

        cart.add(&tee, 98).unwrap();
        assert!(matches!(cart.add(&tee, 2), Err(CartError::InvalidQuantity { quantity: 100, .. })));
        assert_eq!(cart.get("tee").unwrap().quantity, 98);
    }

    #[test]
    fn test_add_rejects_unavailable_products() {
        let mut cart = Cart::default();
        let mut inactive = product("old", 100, 5);
        inactive.is_active = false;

        assert!(matches!(cart.add(&product("gone", 100, 0), 1), Err(CartError::Unavailable(_))));
        assert!(matches!(cart.add(&inactive, 1), Err(CartError::Unavailable(_))));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_respects_stock_including_existing_quantity() {
        let mut cart = Cart::default();
        let mug = product("mug", 1600, 3);
        cart.add(&mug, 2).unwrap();

        let err = cart.add(&mug, 2).unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 3, .. }));
        assert_eq!(cart.get("mug").unwrap().quantity, 2);
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let mut cart = Cart::default();
        cart.add(&product("a", 100, 10), 1).unwrap();
        cart.add(&product("b", 200, 10), 1).unwrap();

        cart.set_quantity("a", 4).unwrap();
        assert_eq!(cart.get("a").unwrap().quantity, 4);

        cart.set_quantity("b", 0).unwrap();
        assert!(cart.get("b").is_none());

        assert!(matches!(cart.set_quantity("zzz", 1), Err(CartError::NotInCart(_))));
        assert!(matches!(cart.remove("b"), Err(CartError::NotInCart(_))));
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::default();
        cart.add(&product("a", 1250, 10), 2).unwrap();
        cart.add(&product("b", 600, 10), 3).unwrap();

        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.subtotal_cents(), 2 * 1250 + 3 * 600);
        assert_eq!(cart.product_ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::default();
        cart.add(&product("a", 100, 10), 1).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal_cents(), 0);
    }
}
