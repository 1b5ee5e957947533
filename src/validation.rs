//! Schema checks for API responses
//!
//! Every payload from the storefront API is checked here before it can reach the
//! cache or the UI. Checks collect all problems with a payload instead of
//! stopping at the first, so a single log line explains a rejected product.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::catalog::Product;
use crate::checkout::CheckoutSession;

/// Highest accepted unit price, in major currency units
pub const MAX_PRICE: f64 = 100_000.0;

/// Category used when the API omits one
pub const DEFAULT_CATEGORY: &str = "general";

/// One problem found in a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON path of the offending field, e.g. `products[2].price`
    pub path: String,
    /// What is wrong with it
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A payload failed schema checks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid API response: {}", summarize(.issues))]
pub struct ValidationError {
    /// Every problem found
    pub issues: Vec<ValidationIssue>,
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }
}

/// Accumulates issues while walking an object
struct Checker<'a> {
    prefix: &'a str,
    issues: Vec<ValidationIssue>,
}

impl<'a> Checker<'a> {
    fn new(prefix: &'a str) -> Self {
        Self {
            prefix,
            issues: Vec::new(),
        }
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        let path = if self.prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.prefix, field)
        };
        self.issues.push(ValidationIssue {
            path,
            message: message.into(),
        });
    }

    fn required_string(&mut self, obj: &Map<String, Value>, field: &str) -> Option<String> {
        match obj.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::String(_)) => {
                self.push(field, "must not be empty");
                None
            }
            Some(Value::Null) | None => {
                self.push(field, "is required");
                None
            }
            Some(_) => {
                self.push(field, "must be a string");
                None
            }
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, field: &str) -> Option<String> {
        match obj.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::String(_)) | Some(Value::Null) | None => None,
            Some(_) => {
                self.push(field, "must be a string");
                None
            }
        }
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ValidationError> {
        match value {
            Some(value) if self.issues.is_empty() => Ok(value),
            _ => Err(ValidationError { issues: self.issues }),
        }
    }
}

/// Converts a price in major units to cents, rounding half away from zero
pub fn price_to_cents(price: f64) -> Option<u64> {
    if !price.is_finite() || price < 0.0 || price > MAX_PRICE {
        return None;
    }
    Some((price * 100.0).round() as u64)
}

/// Checks a single product object
pub fn validate_product(value: &Value) -> Result<Product, ValidationError> {
    validate_product_at(value, "")
}

fn validate_product_at(value: &Value, prefix: &str) -> Result<Product, ValidationError> {
    let Some(obj) = value.as_object() else {
        let path = if prefix.is_empty() { "$" } else { prefix };
        return Err(ValidationError::single(path, "must be an object"));
    };
    let mut check = Checker::new(prefix);

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        Some(Value::Null) | None => {
            check.push("id", "is required");
            None
        }
        Some(_) => {
            check.push("id", "must be a non-empty string or integer");
            None
        }
    };

    let name = check.required_string(obj, "name");
    let description = check.optional_string(obj, "description").unwrap_or_default();
    let category = check
        .optional_string(obj, "category")
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let image_url = check.optional_string(obj, "imageUrl");

    let price_cents = match obj.get("price") {
        Some(Value::Number(n)) => match n.as_f64().and_then(price_to_cents) {
            Some(cents) => Some(cents),
            None => {
                check.push("price", format!("must be between 0 and {}", MAX_PRICE));
                None
            }
        },
        Some(Value::Null) | None => {
            check.push("price", "is required");
            None
        }
        Some(_) => {
            check.push("price", "must be a number");
            None
        }
    };

    let inventory = match obj.get("inventory") {
        Some(Value::Null) | None => Some(0),
        Some(Value::Number(n)) => match n.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) => Some(n),
            None => {
                check.push("inventory", "must be a non-negative integer");
                None
            }
        },
        Some(_) => {
            check.push("inventory", "must be a non-negative integer");
            None
        }
    };

    let is_active = match obj.get("isActive") {
        Some(Value::Null) | None => true,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            check.push("isActive", "must be a boolean");
            true
        }
    };

    let product = match (id, name, price_cents, inventory) {
        (Some(id), Some(name), Some(price_cents), Some(inventory)) => Some(Product {
            id,
            name,
            description,
            price_cents,
            category,
            image_url,
            inventory,
            is_active,
        }),
        _ => None,
    };
    check.finish(product)
}

/// Checks a product listing
///
/// Accepts a bare array or a `{"products": [...]}` envelope. Items that fail
/// checks are dropped and logged; later duplicates of an id are dropped too.
pub fn validate_product_list(value: &Value) -> Result<Vec<Product>, ValidationError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("products") {
            Some(Value::Array(items)) => items,
            _ => return Err(ValidationError::single("products", "must be an array")),
        },
        _ => {
            return Err(ValidationError::single(
                "$",
                "must be an array or an object with a products array",
            ))
        }
    };

    let mut seen = HashSet::new();
    let mut products = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match validate_product_at(item, &format!("products[{}]", index)) {
            Ok(product) => {
                if seen.insert(product.id.clone()) {
                    products.push(product);
                } else {
                    tracing::warn!(id = %product.id, "Dropping duplicate product id");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Dropping invalid product"),
        }
    }
    Ok(products)
}

/// Checks a single-product response, unwrapping a `{"product": {...}}` envelope
pub fn validate_product_response(value: &Value) -> Result<Product, ValidationError> {
    match value.get("product") {
        Some(inner) if inner.is_object() => validate_product_at(inner, "product"),
        _ => validate_product(value),
    }
}

/// Checks the response to a checkout or donation session request
pub fn validate_checkout_session(value: &Value) -> Result<CheckoutSession, ValidationError> {
    let Some(obj) = value.as_object() else {
        return Err(ValidationError::single("$", "must be an object"));
    };
    let mut check = Checker::new("");

    let non_empty = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let session_id = match non_empty("sessionId").or_else(|| non_empty("id")) {
        Some(id) => Some(id.to_string()),
        None => {
            check.push("sessionId", "is required");
            None
        }
    };

    let url = check.required_string(obj, "url");
    let url = url.and_then(|url| {
        if url.starts_with("https://") || url.starts_with("http://") {
            Some(url)
        } else {
            check.push("url", "must be an http(s) URL");
            None
        }
    });

    let session = match (session_id, url) {
        (Some(session_id), Some(url)) => Some(CheckoutSession { session_id, url }),
        _ => None,
    };
    check.finish(session)
}
