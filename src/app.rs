//! Application state for the terminal storefront
//!
//! Key handling is synchronous and only mutates state. Anything that needs the
//! network is queued as a [`PendingAction`] and run by the event loop through
//! [`App::run_pending`], so the screen can show progress first.

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};

use crate::cart::{Cart, CartStore, CartValidation, MAX_QUANTITY_PER_ITEM};
use crate::catalog::{CatalogService, DataSource, Product};
use crate::checkout::{self, CheckoutError};

/// Which screen is showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// Waiting for the first product listing
    Loading,
    ProductList,
    /// Detail view for the product with this id
    ProductDetail(String),
    Cart,
}

/// Work that needs the network, run between frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    LoadProducts { refresh: bool },
    /// Check the cart against live inventory and apply fixes
    ValidateCart,
    Checkout,
}

impl PendingAction {
    /// What to show while the action runs
    pub fn progress_label(self) -> &'static str {
        match self {
            PendingAction::LoadProducts { .. } => "Loading products...",
            PendingAction::ValidateCart => "Checking cart against inventory...",
            PendingAction::Checkout => "Starting checkout...",
        }
    }
}

/// One-line message shown in the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

/// Main application struct managing state and data
pub struct App {
    pub state: AppState,
    /// Selected row in the product list
    pub selected_index: usize,
    /// Selected line in the cart view
    pub cart_index: usize,
    /// Current product listing
    pub products: Vec<Product>,
    /// Where the listing came from
    pub source: Option<DataSource>,
    pub should_quit: bool,
    pub show_help: bool,
    pub last_refresh: Option<DateTime<Local>>,
    /// Quantity to add from the detail view
    pub quantity: u32,
    pub status: Option<StatusMessage>,
    pub pending: Option<PendingAction>,
    /// Outcome of the last cart check
    pub last_validation: Option<CartValidation>,
    /// Payment link from the last successful checkout
    pub checkout_url: Option<String>,
    catalog: CatalogService,
    carts: CartStore,
}

impl App {
    /// Creates the app; the first product load is queued immediately
    pub fn new(catalog: CatalogService, carts: CartStore) -> Self {
        Self {
            state: AppState::Loading,
            selected_index: 0,
            cart_index: 0,
            products: Vec::new(),
            source: None,
            should_quit: false,
            show_help: false,
            last_refresh: None,
            quantity: 1,
            status: None,
            pending: Some(PendingAction::LoadProducts { refresh: false }),
            last_validation: None,
            checkout_url: None,
            catalog,
            carts,
        }
    }

    pub fn cart(&self) -> &Cart {
        self.carts.cart()
    }

    pub fn is_offline(&self) -> bool {
        self.catalog.is_offline()
    }

    /// Product under the list cursor
    pub fn selected_product(&self) -> Option<&Product> {
        self.products.get(self.selected_index)
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Handles keyboard input and updates state accordingly
    ///
    /// # Key Bindings
    /// - `q`: Quit (also `Esc` in the product list)
    /// - `Up`/`k`, `Down`/`j`: Move selection
    /// - `Enter`: Open product details (list) or check out (cart)
    /// - `a`: Add to cart
    /// - `c`: Open the cart
    /// - `+`/`-`: Change quantity (detail view and cart)
    /// - `d`: Remove cart line; `x`: Empty the cart
    /// - `v`: Check the cart against inventory
    /// - `r`: Refresh products
    /// - `?`: Toggle help
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        if self.show_help {
            if matches!(key_event.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                self.show_help = false;
            }
            return;
        }
        // Nothing else is accepted while an action is queued
        if self.pending.is_some() {
            if key_event.code == KeyCode::Char('q') {
                self.should_quit = true;
            }
            return;
        }

        match self.state.clone() {
            AppState::Loading => {
                if key_event.code == KeyCode::Char('q') {
                    self.should_quit = true;
                }
            }
            AppState::ProductList => match key_event.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Up | KeyCode::Char('k') => self.move_selection_up(),
                KeyCode::Down | KeyCode::Char('j') => self.move_selection_down(),
                KeyCode::Enter => {
                    if let Some(product) = self.selected_product() {
                        self.state = AppState::ProductDetail(product.id.clone());
                        self.quantity = 1;
                    }
                }
                KeyCode::Char('a') => {
                    if let Some(id) = self.selected_product().map(|p| p.id.clone()) {
                        self.add_to_cart(&id, 1);
                    }
                }
                KeyCode::Char('c') => self.open_cart(),
                KeyCode::Char('r') => self.pending = Some(PendingAction::LoadProducts { refresh: true }),
                KeyCode::Char('?') => self.show_help = true,
                _ => {}
            },
            AppState::ProductDetail(id) => match key_event.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Esc => self.state = AppState::ProductList,
                KeyCode::Char('+') | KeyCode::Char('=') => {
                    self.quantity = (self.quantity + 1).min(MAX_QUANTITY_PER_ITEM);
                }
                KeyCode::Char('-') => self.quantity = self.quantity.saturating_sub(1).max(1),
                KeyCode::Char('a') => {
                    if self.add_to_cart(&id, self.quantity) {
                        self.quantity = 1;
                    }
                }
                KeyCode::Char('c') => self.open_cart(),
                KeyCode::Char('?') => self.show_help = true,
                _ => {}
            },
            AppState::Cart => match key_event.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Esc => self.state = AppState::ProductList,
                KeyCode::Up | KeyCode::Char('k') => self.move_cart_selection(-1),
                KeyCode::Down | KeyCode::Char('j') => self.move_cart_selection(1),
                KeyCode::Char('+') | KeyCode::Char('=') => self.change_line_quantity(1),
                KeyCode::Char('-') => self.change_line_quantity(-1),
                KeyCode::Char('d') | KeyCode::Delete => self.remove_selected_line(),
                KeyCode::Char('x') => self.clear_cart(),
                KeyCode::Char('v') => {
                    if !self.cart().is_empty() {
                        self.pending = Some(PendingAction::ValidateCart);
                    }
                }
                KeyCode::Enter => {
                    if self.cart().is_empty() {
                        self.set_error("Cart is empty");
                    } else if self.is_offline() {
                        self.set_error("Checkout needs the store to be reachable");
                    } else {
                        self.pending = Some(PendingAction::Checkout);
                    }
                }
                KeyCode::Char('?') => self.show_help = true,
                _ => {}
            },
        }
    }

    /// Runs the queued action, if any
    pub async fn run_pending(&mut self) {
        let Some(action) = self.pending.take() else {
            return;
        };
        match action {
            PendingAction::LoadProducts { refresh } => self.load_products(refresh).await,
            PendingAction::ValidateCart => self.validate_cart().await,
            PendingAction::Checkout => self.checkout().await,
        }
    }

    async fn load_products(&mut self, refresh: bool) {
        let listing = if refresh {
            self.catalog.refresh_products().await
        } else {
            self.catalog.products().await
        };
        let selected_id = self.selected_product().map(|p| p.id.clone());
        self.products = listing.data;
        self.source = Some(listing.source);
        self.selected_index = selected_id
            .and_then(|id| self.products.iter().position(|p| p.id == id))
            .unwrap_or(0);
        self.last_refresh = Some(Local::now());

        if !listing.source.is_current() {
            self.set_error(format!("Showing {} data", listing.source));
        } else if refresh {
            self.set_info(format!("Loaded {} products", self.products.len()));
        }
        if self.state == AppState::Loading {
            self.state = AppState::ProductList;
        }
    }

    async fn validate_cart(&mut self) {
        match self.carts.validate_and_reconcile(&self.catalog, true).await {
            Ok(validation) => {
                if !validation.is_authoritative() {
                    self.set_error(format!(
                        "Store unreachable ({} data); cart left unchanged",
                        validation.source
                    ));
                } else if validation.is_valid() {
                    self.set_info("Cart is up to date");
                } else {
                    self.set_info(format!("Updated {} line(s) to match inventory", validation.issues.len()));
                }
                self.last_validation = Some(validation);
                self.clamp_cart_index();
            }
            Err(e) => self.set_error(e.to_string()),
        }
    }

    async fn checkout(&mut self) {
        match checkout::checkout(&self.catalog, &mut self.carts, None).await {
            Ok(session) => {
                self.set_info("Checkout ready; open the payment link to pay");
                self.checkout_url = Some(session.url);
                self.last_validation = None;
            }
            Err(CheckoutError::CartChanged(validation)) => {
                self.set_error("Cart changed to match inventory; review it and press Enter again");
                self.last_validation = Some(validation);
                self.clamp_cart_index();
            }
            Err(e) => self.set_error(e.to_string()),
        }
    }

    /// Adds to the cart, reporting the outcome in the status line
    fn add_to_cart(&mut self, id: &str, quantity: u32) -> bool {
        let Some(product) = self.product(id).cloned() else {
            return false;
        };
        match self.carts.add(&product, quantity) {
            Ok(item) => {
                self.set_info(format!("Added {} x {} (now {} in cart)", quantity, product.name, item.quantity));
                self.checkout_url = None;
                true
            }
            Err(e) => {
                self.set_error(e.to_string());
                false
            }
        }
    }

    fn open_cart(&mut self) {
        self.state = AppState::Cart;
        self.clamp_cart_index();
    }

    fn change_line_quantity(&mut self, delta: i64) {
        let Some(item) = self.cart().items.get(self.cart_index) else {
            return;
        };
        let id = item.product_id.clone();
        let quantity = (i64::from(item.quantity) + delta).clamp(0, i64::from(MAX_QUANTITY_PER_ITEM));
        let quantity = u32::try_from(quantity).unwrap_or(0);
        if let Err(e) = self.carts.set_quantity(&id, quantity) {
            self.set_error(e.to_string());
        }
        self.checkout_url = None;
        self.clamp_cart_index();
    }

    fn remove_selected_line(&mut self) {
        let Some(id) = self.cart().items.get(self.cart_index).map(|i| i.product_id.clone()) else {
            return;
        };
        match self.carts.remove(&id) {
            Ok(item) => self.set_info(format!("Removed {}", item.name)),
            Err(e) => self.set_error(e.to_string()),
        }
        self.checkout_url = None;
        self.clamp_cart_index();
    }

    fn clear_cart(&mut self) {
        match self.carts.clear() {
            Ok(()) => self.set_info("Cart emptied"),
            Err(e) => self.set_error(e.to_string()),
        }
        self.checkout_url = None;
        self.last_validation = None;
        self.cart_index = 0;
    }

    /// Moves the selection up in the list, wrapping to bottom if at top
    fn move_selection_up(&mut self) {
        let count = self.products.len();
        if count == 0 {
            return;
        }
        if self.selected_index == 0 {
            self.selected_index = count - 1;
        } else {
            self.selected_index -= 1;
        }
    }

    /// Moves the selection down in the list, wrapping to top if at bottom
    fn move_selection_down(&mut self) {
        let count = self.products.len();
        if count == 0 {
            return;
        }
        self.selected_index = (self.selected_index + 1) % count;
    }

    fn move_cart_selection(&mut self, delta: isize) {
        let count = self.cart().items.len();
        if count == 0 {
            return;
        }
        self.cart_index = (self.cart_index as isize + delta).rem_euclid(count as isize) as usize;
    }

    fn clamp_cart_index(&mut self) {
        let count = self.cart().items.len();
        self.cart_index = self.cart_index.min(count.saturating_sub(1));
    }

    fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: true,
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::TieredCache;
    use crate::cart::tests::product;
    use crate::catalog::{ApiClient, CatalogSettings};
    use crate::storage::JsonStore;
    use crossterm::event::KeyModifiers;
    use std::time::Duration;
    use tempfile::TempDir;

    /// App with an offline catalog, a cart in `temp_dir` and a loaded product list
    pub(crate) fn create_test_app(temp_dir: &TempDir) -> App {
        let client = ApiClient::new("http://127.0.0.1:9/api", Duration::from_millis(200)).unwrap();
        let settings = CatalogSettings {
            offline: true,
            ..CatalogSettings::default()
        };
        let catalog = CatalogService::new(client, TieredCache::memory_only(), settings);
        let carts = CartStore::open(JsonStore::new(temp_dir.path())).unwrap();

        let mut app = App::new(catalog, carts);
        app.pending = None;
        app.products = vec![product("tee", 2500, 10), product("mug", 1600, 3), product("pin", 500, 0)];
        app.source = Some(DataSource::Cached);
        app.state = AppState::ProductList;
        app
    }

    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, codes: &[KeyCode]) {
        for code in codes {
            app.handle_key(key_event(*code));
        }
    }

    #[test]
    fn test_new_app_queues_initial_load() {
        let temp_dir = TempDir::new().unwrap();
        let app = App::new(
            CatalogService::new(
                ApiClient::new("http://127.0.0.1:9/api", Duration::from_millis(200)).unwrap(),
                TieredCache::memory_only(),
                CatalogSettings::default(),
            ),
            CartStore::open(JsonStore::new(temp_dir.path())).unwrap(),
        );
        assert_eq!(app.state, AppState::Loading);
        assert_eq!(app.pending, Some(PendingAction::LoadProducts { refresh: false }));
    }

    #[tokio::test]
    async fn test_initial_load_moves_to_product_list() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        app.state = AppState::Loading;
        app.pending = Some(PendingAction::LoadProducts { refresh: false });

        app.run_pending().await;

        assert_eq!(app.state, AppState::ProductList);
        assert_eq!(app.source, Some(DataSource::Fallback));
        assert!(app.last_refresh.is_some());
        assert!(app.status.as_ref().is_some_and(|s| s.is_error));
        assert!(app.pending.is_none());
    }

    #[test]
    fn test_navigation_wraps() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);

        press(&mut app, &[KeyCode::Up]);
        assert_eq!(app.selected_index, 2);
        press(&mut app, &[KeyCode::Char('j')]);
        assert_eq!(app.selected_index, 0);
        press(&mut app, &[KeyCode::Down, KeyCode::Char('k')]);
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn test_enter_opens_detail_and_esc_returns() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);

        press(&mut app, &[KeyCode::Down, KeyCode::Enter]);
        assert_eq!(app.state, AppState::ProductDetail("mug".to_string()));

        press(&mut app, &[KeyCode::Esc]);
        assert_eq!(app.state, AppState::ProductList);
    }

    #[test]
    fn test_add_from_list() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);

        press(&mut app, &[KeyCode::Char('a'), KeyCode::Char('a')]);

        assert_eq!(app.cart().get("tee").unwrap().quantity, 2);
        assert!(!app.status.as_ref().unwrap().is_error);
    }

    #[test]
    fn test_add_unavailable_reports_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        app.selected_index = 2;

        press(&mut app, &[KeyCode::Char('a')]);

        assert!(app.cart().is_empty());
        assert!(app.status.as_ref().unwrap().is_error);
    }

    #[test]
    fn test_detail_quantity_and_add() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        press(&mut app, &[KeyCode::Enter]);

        press(&mut app, &[KeyCode::Char('+'), KeyCode::Char('+'), KeyCode::Char('-')]);
        assert_eq!(app.quantity, 2);
        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('-')]);
        assert_eq!(app.quantity, 1);

        press(&mut app, &[KeyCode::Char('+'), KeyCode::Char('+'), KeyCode::Char('a')]);
        assert_eq!(app.cart().get("tee").unwrap().quantity, 3);
        assert_eq!(app.quantity, 1);
    }

    #[test]
    fn test_detail_add_beyond_stock_keeps_quantity() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        app.selected_index = 1;
        press(&mut app, &[KeyCode::Enter]);

        for _ in 0..4 {
            press(&mut app, &[KeyCode::Char('+')]);
        }
        press(&mut app, &[KeyCode::Char('a')]);

        assert!(app.cart().is_empty());
        assert_eq!(app.quantity, 5);
    }

    #[test]
    fn test_cart_view_editing() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        press(&mut app, &[KeyCode::Char('a'), KeyCode::Down, KeyCode::Char('a'), KeyCode::Char('c')]);
        assert_eq!(app.state, AppState::Cart);

        press(&mut app, &[KeyCode::Char('+'), KeyCode::Char('+')]);
        assert_eq!(app.cart().get("tee").unwrap().quantity, 3);

        press(&mut app, &[KeyCode::Char('j'), KeyCode::Char('-')]);
        assert!(app.cart().get("mug").is_none());
        assert_eq!(app.cart_index, 0);

        press(&mut app, &[KeyCode::Char('d')]);
        assert!(app.cart().is_empty());
    }

    #[test]
    fn test_cart_persists_between_apps() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        press(&mut app, &[KeyCode::Char('a')]);

        let reopened = create_test_app(&temp_dir);
        assert_eq!(reopened.cart().item_count(), 1);
    }

    #[test]
    fn test_clear_cart() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        press(&mut app, &[KeyCode::Char('a'), KeyCode::Char('c'), KeyCode::Char('x')]);
        assert!(app.cart().is_empty());
    }

    #[test]
    fn test_checkout_refused_offline_and_when_empty() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        press(&mut app, &[KeyCode::Char('c'), KeyCode::Enter]);
        assert_eq!(app.status.as_ref().unwrap().text, "Cart is empty");

        press(&mut app, &[KeyCode::Esc, KeyCode::Char('a'), KeyCode::Char('c'), KeyCode::Enter]);
        assert!(app.pending.is_none());
        assert!(app.status.as_ref().unwrap().is_error);
    }

    #[tokio::test]
    async fn test_validate_offline_is_flagged() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        press(&mut app, &[KeyCode::Char('a'), KeyCode::Char('c'), KeyCode::Char('v')]);
        assert_eq!(app.pending, Some(PendingAction::ValidateCart));

        app.run_pending().await;

        let validation = app.last_validation.as_ref().unwrap();
        assert!(!validation.is_authoritative());
        assert!(app.status.as_ref().unwrap().is_error);
        assert!(app.status.as_ref().unwrap().text.contains("left unchanged"));
        // The offline catalog knows nothing about "tee", but the line stays
        assert_eq!(app.cart().get("tee").unwrap().quantity, 1);
        let reopened = CartStore::open(JsonStore::new(temp_dir.path())).unwrap();
        assert_eq!(reopened.cart().get("tee").unwrap().quantity, 1);
    }

    #[test]
    fn test_refresh_queues_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        press(&mut app, &[KeyCode::Char('r')]);
        assert_eq!(app.pending, Some(PendingAction::LoadProducts { refresh: true }));

        // Other keys wait until the load has run
        press(&mut app, &[KeyCode::Down]);
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn test_help_overlay_intercepts_keys() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        press(&mut app, &[KeyCode::Char('?')]);
        assert!(app.show_help);

        press(&mut app, &[KeyCode::Down]);
        assert_eq!(app.selected_index, 0);

        press(&mut app, &[KeyCode::Esc]);
        assert!(!app.show_help);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_quit_keys() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        press(&mut app, &[KeyCode::Esc]);
        assert!(app.should_quit);

        let mut app = create_test_app(&temp_dir);
        press(&mut app, &[KeyCode::Char('c'), KeyCode::Char('q')]);
        assert!(app.should_quit);
    }
}
