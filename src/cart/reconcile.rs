//! Cart-vs-inventory checks and reconciliation

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::Cart;
use crate::catalog::{format_cents, DataSource, Product};

/// What is wrong with a cart line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// Product no longer exists or is no longer listed
    Unavailable,
    /// Product exists but has no stock
    OutOfStock,
    /// Fewer units in stock than the line asks for
    InsufficientStock { requested: u32, available: u32 },
    /// The unit price changed since the line was added
    PriceChanged { previous_cents: u64, current_cents: u64 },
    /// The product was renamed since the line was added
    Renamed { current_name: String },
}

/// A problem with one cart line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartIssue {
    pub product_id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for CartIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::Unavailable => write!(f, "{} is no longer available", self.name),
            IssueKind::OutOfStock => write!(f, "{} is out of stock", self.name),
            IssueKind::InsufficientStock {
                requested,
                available,
            } => write!(f, "{}: only {} of {} requested in stock", self.name, available, requested),
            IssueKind::PriceChanged {
                previous_cents,
                current_cents,
            } => write!(
                f,
                "{}: price changed from {} to {}",
                self.name,
                format_cents(*previous_cents),
                format_cents(*current_cents)
            ),
            IssueKind::Renamed { current_name } => {
                write!(f, "{} is now called {}", self.name, current_name)
            }
        }
    }
}

/// Result of checking a cart against inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartValidation {
    pub issues: Vec<CartIssue>,
    /// Where the inventory data came from; only `Live` is authoritative
    pub source: DataSource,
    pub checked_at: DateTime<Utc>,
}

impl CartValidation {
    /// No issues were found
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// The check used live inventory
    pub fn is_authoritative(&self) -> bool {
        self.source == DataSource::Live
    }
}

impl Cart {
    /// Checks every line against `products`
    ///
    /// A line whose product is absent from `products` is reported as unavailable,
    /// so callers must pass the products for every id in the cart.
    pub fn validate(&self, products: &[Product], source: DataSource) -> CartValidation {
        let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();
        let mut issues = Vec::new();

        for item in &self.items {
            let issue = |kind| CartIssue {
                product_id: item.product_id.clone(),
                name: item.name.clone(),
                kind,
            };

            let Some(product) = by_id.get(item.product_id.as_str()).copied() else {
                issues.push(issue(IssueKind::Unavailable));
                continue;
            };
            if !product.is_active {
                issues.push(issue(IssueKind::Unavailable));
                continue;
            }
            if product.inventory == 0 {
                issues.push(issue(IssueKind::OutOfStock));
                continue;
            }
            if item.quantity > product.inventory {
                issues.push(issue(IssueKind::InsufficientStock {
                    requested: item.quantity,
                    available: product.inventory,
                }));
            }
            if item.unit_price_cents != product.price_cents {
                issues.push(issue(IssueKind::PriceChanged {
                    previous_cents: item.unit_price_cents,
                    current_cents: product.price_cents,
                }));
            }
            if item.name != product.name {
                issues.push(issue(IssueKind::Renamed {
                    current_name: product.name.clone(),
                }));
            }
        }

        CartValidation {
            issues,
            source,
            checked_at: Utc::now(),
        }
    }

    /// Applies the fixes implied by `validation`, returning how many lines changed
    ///
    /// Unavailable and out-of-stock lines are removed, quantities are clamped to
    /// stock, and prices and names are refreshed. Callers decide whether the
    /// validation is trustworthy enough to act on.
    pub fn reconcile(&mut self, validation: &CartValidation) -> usize {
        let mut changed = std::collections::HashSet::new();

        for issue in &validation.issues {
            match &issue.kind {
                IssueKind::Unavailable | IssueKind::OutOfStock => {
                    let before = self.items.len();
                    self.items.retain(|item| item.product_id != issue.product_id);
                    if self.items.len() != before {
                        changed.insert(issue.product_id.clone());
                    }
                }
                IssueKind::InsufficientStock { available, .. } => {
                    if let Some(item) = self.items.iter_mut().find(|i| i.product_id == issue.product_id) {
                        item.quantity = (*available).min(super::MAX_QUANTITY_PER_ITEM);
                        changed.insert(issue.product_id.clone());
                    }
                }
                IssueKind::PriceChanged { current_cents, .. } => {
                    if let Some(item) = self.items.iter_mut().find(|i| i.product_id == issue.product_id) {
                        item.unit_price_cents = *current_cents;
                        changed.insert(issue.product_id.clone());
                    }
                }
                IssueKind::Renamed { current_name } => {
                    if let Some(item) = self.items.iter_mut().find(|i| i.product_id == issue.product_id) {
                        item.name = current_name.clone();
                        changed.insert(issue.product_id.clone());
                    }
                }
            }
        }

        if !changed.is_empty() {
            self.updated_at = Utc::now();
            tracing::info!(lines = changed.len(), "Reconciled cart with inventory");
        }
        changed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::product;
    use super::*;

    fn cart_with(lines: &[(&Product, u32)]) -> Cart {
        let mut cart = Cart::default();
        for (product, quantity) in lines {
            cart.add(product, *quantity).unwrap();
        }
        cart
    }

    #[test]
    fn test_clean_cart_is_valid() {
        let tee = product("tee", 2500, 10);
        let cart = cart_with(&[(&tee, 2)]);

        let validation = cart.validate(&[tee], DataSource::Live);

        assert!(validation.is_valid());
        assert!(validation.is_authoritative());
    }

    #[test]
    fn test_detects_each_issue_kind() {
        let (a, b, c, d, e) = (
            product("a", 100, 10),
            product("b", 100, 10),
            product("c", 100, 10),
            product("d", 100, 10),
            product("e", 100, 10),
        );
        let cart = cart_with(&[(&a, 1), (&b, 1), (&c, 5), (&d, 1), (&e, 1)]);

        let mut b_now = b.clone();
        b_now.inventory = 0;
        let mut c_now = c.clone();
        c_now.inventory = 2;
        let mut d_now = d.clone();
        d_now.price_cents = 150;
        let mut e_now = e.clone();
        e_now.is_active = false;

        // `a` is missing from the live data entirely
        let validation = cart.validate(&[b_now, c_now, d_now, e_now], DataSource::Live);
        let kinds: Vec<(&str, &IssueKind)> = validation
            .issues
            .iter()
            .map(|i| (i.product_id.as_str(), &i.kind))
            .collect();

        assert_eq!(
            kinds,
            vec![
                ("a", &IssueKind::Unavailable),
                ("b", &IssueKind::OutOfStock),
                ("c", &IssueKind::InsufficientStock { requested: 5, available: 2 }),
                ("d", &IssueKind::PriceChanged { previous_cents: 100, current_cents: 150 }),
                ("e", &IssueKind::Unavailable),
            ]
        );
    }

    #[test]
    fn test_stock_and_price_issues_reported_together() {
        let mug = product("mug", 1600, 10);
        let cart = cart_with(&[(&mug, 4)]);
        let mut now = mug.clone();
        now.inventory = 1;
        now.price_cents = 1800;

        let validation = cart.validate(&[now], DataSource::Live);
        assert_eq!(validation.issues.len(), 2);
    }

    #[test]
    fn test_reconcile_applies_fixes() {
        let (a, b, c, d) = (
            product("a", 100, 10),
            product("b", 100, 10),
            product("c", 100, 10),
            product("d", 100, 10),
        );
        let mut cart = cart_with(&[(&a, 1), (&b, 1), (&c, 5), (&d, 1)]);
        let mut c_now = c.clone();
        c_now.inventory = 2;
        let mut d_now = d.clone();
        d_now.price_cents = 150;
        d_now.name = "Product d (new edition)".to_string();
        let mut b_now = b.clone();
        b_now.inventory = 0;

        let validation = cart.validate(&[b_now, c_now, d_now], DataSource::Live);
        let changed = cart.reconcile(&validation);

        assert_eq!(changed, 4);
        assert_eq!(cart.product_ids(), vec!["c", "d"]);
        assert_eq!(cart.get("c").unwrap().quantity, 2);
        let d_line = cart.get("d").unwrap();
        assert_eq!(d_line.unit_price_cents, 150);
        assert_eq!(d_line.name, "Product d (new edition)");
    }

    #[test]
    fn test_rename_alone_is_detected_and_applied() {
        let pin = product("pin", 500, 10);
        let mut cart = cart_with(&[(&pin, 2)]);
        let mut now = pin.clone();
        now.name = "Enamel Pin".to_string();

        let validation = cart.validate(&[now.clone()], DataSource::Live);
        assert_eq!(
            validation.issues[0].kind,
            IssueKind::Renamed {
                current_name: "Enamel Pin".to_string()
            }
        );
        assert_eq!(validation.issues[0].to_string(), "Product pin is now called Enamel Pin");

        assert_eq!(cart.reconcile(&validation), 1);
        let line = cart.get("pin").unwrap();
        assert_eq!(line.name, "Enamel Pin");
        assert_eq!(line.quantity, 2);
        assert!(cart.validate(&[now], DataSource::Live).is_valid());
    }

    #[test]
    fn test_reconciled_cart_validates_clean() {
        let mug = product("mug", 1600, 10);
        let mut cart = cart_with(&[(&mug, 4)]);
        let mut now = mug.clone();
        now.inventory = 1;
        now.price_cents = 1800;

        let validation = cart.validate(&[now.clone()], DataSource::Live);
        cart.reconcile(&validation);

        assert!(cart.validate(&[now], DataSource::Live).is_valid());
        assert_eq!(cart.subtotal_cents(), 1800);
    }

    #[test]
    fn test_issue_messages() {
        let mug = product("mug", 1600, 10);
        let cart = cart_with(&[(&mug, 1)]);
        let mut now = mug.clone();
        now.price_cents = 1800;

        let validation = cart.validate(&[now], DataSource::Cached);
        assert_eq!(
            validation.issues[0].to_string(),
            "Product mug: price changed from $16.00 to $18.00"
        );
        assert!(!validation.is_authoritative());
    }
}
