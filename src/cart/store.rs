//! Persistent cart backed by the durable key-value store

use super::{Cart, CartError, CartItem, CartValidation};
use crate::catalog::{CatalogService, DataSource, Product};
use crate::storage::{JsonStore, StorageError};

/// Key the cart is stored under
pub const CART_KEY: &str = "cart";

/// Cart that writes itself back to storage after every change
#[derive(Debug)]
pub struct CartStore {
    store: JsonStore,
    cart: Cart,
}

impl CartStore {
    /// Loads the cart from `store`, starting empty if none is stored
    ///
    /// A stored cart that cannot be decoded is logged and replaced with an empty
    /// one rather than blocking the storefront. Lines with out-of-range
    /// quantities are dropped or clamped and the result written back. I/O errors
    /// are returned.
    pub fn open(store: JsonStore) -> Result<Self, StorageError> {
        let mut cart = match store.read::<Cart>(CART_KEY) {
            Ok(cart) => cart.unwrap_or_default(),
            Err(StorageError::Json(e)) => {
                tracing::warn!(error = %e, "Stored cart is unreadable, starting with an empty cart");
                Cart::default()
            }
            Err(e) => return Err(e),
        };
        let fixed = cart.normalize_quantities();
        let carts = Self { store, cart };
        if fixed > 0 {
            tracing::warn!(lines = fixed, "Stored cart had out-of-range quantities, corrected");
            carts.save()?;
        }
        tracing::debug!(items = carts.cart.items.len(), "Loaded cart");
        Ok(carts)
    }

    /// Current cart contents
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Adds `quantity` of `product`, then persists
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<CartItem, CartError> {
        let item = self.cart.add(product, quantity)?.clone();
        self.save()?;
        Ok(item)
    }

    /// Removes a line, then persists
    pub fn remove(&mut self, product_id: &str) -> Result<CartItem, CartError> {
        let item = self.cart.remove(product_id)?;
        self.save()?;
        Ok(item)
    }

    /// Sets a line's quantity (zero removes), then persists
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        self.cart.set_quantity(product_id, quantity)?;
        self.save()?;
        Ok(())
    }

    /// Empties the cart, then persists
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.cart.clear();
        self.save()?;
        Ok(())
    }

    /// Checks the cart against the catalog's live inventory
    ///
    /// With `fix`, the implied fixes are applied and persisted, but only when the
    /// check used live inventory. The returned validation always describes the
    /// cart as it was before fixing.
    pub async fn validate_and_reconcile(
        &mut self,
        catalog: &CatalogService,
        fix: bool,
    ) -> Result<CartValidation, CartError> {
        let validation = self.validate(catalog).await;
        if fix {
            self.reconcile(&validation)?;
        }
        Ok(validation)
    }

    /// Applies the fixes implied by `validation`, persisting if anything changed
    ///
    /// A validation against non-live data changes nothing: bundled and cached
    /// products would otherwise empty the cart whenever the store is unreachable.
    pub fn reconcile(&mut self, validation: &CartValidation) -> Result<usize, CartError> {
        if !validation.is_authoritative() {
            tracing::info!(source = %validation.source, "Not reconciling cart against non-live inventory");
            return Ok(0);
        }
        let changed = self.cart.reconcile(validation);
        if changed > 0 {
            self.save()?;
        }
        Ok(changed)
    }

    /// Checks the cart against the catalog's live inventory without changing it
    pub async fn validate(&self, catalog: &CatalogService) -> CartValidation {
        if self.cart.is_empty() {
            return self.cart.validate(&[], DataSource::Live);
        }
        let live = catalog.live_products_for(&self.cart.product_ids()).await;
        let validation = self.cart.validate(&live.data, live.source);
        if !validation.is_authoritative() {
            tracing::warn!(source = %live.source, "Cart checked against non-live inventory");
        }
        validation
    }

    fn save(&self) -> Result<(), StorageError> {
        self.store.write(CART_KEY, &self.cart)
    }
}
