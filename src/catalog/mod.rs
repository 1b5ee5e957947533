//! Product catalog
//!
//! Product types, the bundled fallback catalog, the storefront API client and the
//! caching service that ties them together.

pub mod client;
pub mod fallback;
pub mod service;

pub use client::{ApiClient, ApiError};
pub use fallback::{fallback_product, fallback_products};
pub use service::{CatalogService, CatalogSettings, ServiceError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A product offered in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable product identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Longer description, possibly empty
    pub description: String,
    /// Unit price in cents
    pub price_cents: u64,
    /// Category slug used for filtering
    pub category: String,
    /// Product image, if any
    pub image_url: Option<String>,
    /// Units in stock
    pub inventory: u32,
    /// Whether the product is listed for sale
    pub is_active: bool,
}

impl Product {
    /// Whether the product can be added to a cart right now
    pub fn is_available(&self) -> bool {
        self.is_active && self.inventory > 0
    }

    /// Unit price formatted for display
    pub fn display_price(&self) -> String {
        format_cents(self.price_cents)
    }
}

/// Formats an amount in cents as dollars, e.g. `1234` -> `$12.34`
pub fn format_cents(cents: u64) -> String {
    let dollars = cents / 100;
    let mut grouped = String::new();
    let digits = dollars.to_string();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${}.{:02}", grouped, cents % 100)
}

/// Where a piece of catalog data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Fetched from the API just now
    Live,
    /// Served from an unexpired cache entry
    Cached,
    /// Served from an expired cache entry because the API was unreachable
    Stale,
    /// Served from the bundled fallback catalog
    Fallback,
}

impl DataSource {
    /// Whether the data reflects the server's current state
    pub fn is_current(self) -> bool {
        matches!(self, DataSource::Live | DataSource::Cached)
    }

    /// Short label for status lines
    pub fn label(self) -> &'static str {
        match self {
            DataSource::Live => "live",
            DataSource::Cached => "cached",
            DataSource::Stale => "offline (stale cache)",
            DataSource::Fallback => "offline (bundled catalog)",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Data tagged with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub data: T,
    pub source: DataSource,
}

impl<T> Sourced<T> {
    pub fn new(data: T, source: DataSource) -> Self {
        Self { data, source }
    }
}

impl Sourced<Vec<Product>> {
    /// Keeps only products in `category`, case-insensitive
    pub fn in_category(self, category: &str) -> Self {
        let data = self
            .data
            .into_iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category))
            .collect();
        Self::new(data, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(inventory: u32, is_active: bool) -> Product {
        Product {
            id: "mug".to_string(),
            name: "Mug".to_string(),
            description: String::new(),
            price_cents: 1200,
            category: "home".to_string(),
            image_url: None,
            inventory,
            is_active,
        }
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "$0.00");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(1234), "$12.34");
        assert_eq!(format_cents(100_000), "$1,000.00");
        assert_eq!(format_cents(123_456_789), "$1,234,567.89");
    }

    #[test]
    fn test_availability() {
        assert!(product(3, true).is_available());
        assert!(!product(0, true).is_available());
        assert!(!product(3, false).is_available());
    }

    #[test]
    fn test_data_source_currency() {
        assert!(DataSource::Live.is_current());
        assert!(DataSource::Cached.is_current());
        assert!(!DataSource::Stale.is_current());
        assert!(!DataSource::Fallback.is_current());
        assert_eq!(DataSource::Fallback.to_string(), "offline (bundled catalog)");
    }
}
