//! Storefront REST API client
//!
//! Thin reqwest wrapper over the store's endpoints. Every response body goes
//! through [`crate::validation`] before it is handed back.

use reqwest::{Client, Response, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::Product;
use crate::checkout::{CheckoutRequest, CheckoutSession};
use crate::donation::DonationRequest;
use crate::validation::{self, ValidationError};

/// Errors that can occur when talking to the storefront API
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, body read)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The configured base URL cannot be used
    #[error("Invalid API URL '{0}'")]
    InvalidUrl(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server answered with a non-success status
    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body failed schema checks
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl ApiError {
    /// Whether the error means the API could not be reached or answered badly,
    /// as opposed to a definitive answer such as "not found"
    pub fn is_unavailable(&self) -> bool {
        match self {
            ApiError::RequestFailed(_) | ApiError::Invalid(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ApiError::InvalidUrl(_) | ApiError::NotFound(_) => false,
        }
    }
}

/// Client for the storefront API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_client(http, base_url)
    }

    /// Creates a client around an existing HTTP client
    pub fn with_client(http: Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|_| ApiError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    /// The API root all endpoints hang off
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Builds an endpoint URL; segments are percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetches the full product listing
    pub async fn fetch_products(&self) -> Result<Vec<Product>, ApiError> {
        let url = self.endpoint(&["products"])?;
        tracing::info!(%url, "Fetching product list");
        let body = self.get_json(url, "product list").await?;
        Ok(validation::validate_product_list(&body)?)
    }

    /// Fetches a single product
    ///
    /// # Returns
    /// * `Err(ApiError::NotFound)` - If the API reports no such product
    pub async fn fetch_product(&self, id: &str) -> Result<Product, ApiError> {
        let url = self.endpoint(&["products", id])?;
        tracing::info!(%url, "Fetching product");
        let body = self.get_json(url, &format!("product '{}'", id)).await?;
        Ok(validation::validate_product_response(&body)?)
    }

    /// Opens a payment session for a cart checkout
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ApiError> {
        let url = self.endpoint(&["checkout"])?;
        tracing::info!(%url, items = request.items.len(), "Creating checkout session");
        let body = self.post_json(url, request).await?;
        Ok(validation::validate_checkout_session(&body)?)
    }

    /// Opens a payment session for a donation
    pub async fn create_donation_session(
        &self,
        request: &DonationRequest,
    ) -> Result<CheckoutSession, ApiError> {
        let url = self.endpoint(&["donations"])?;
        tracing::info!(%url, amount_cents = request.amount_cents, "Creating donation session");
        let body = self.post_json(url, request).await?;
        Ok(validation::validate_checkout_session(&body)?)
    }

    async fn get_json(&self, url: Url, what: &str) -> Result<Value, ApiError> {
        let response = self.http.get(url).send().await?;
        read_json(response, what).await
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<Value, ApiError> {
        let response = self.http.post(url).json(body).send().await?;
        read_json(response, "request").await
    }
}

/// Maps status codes to errors and decodes the JSON body
async fn read_json(response: Response, what: &str) -> Result<Value, ApiError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&text, status),
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        ApiError::Invalid(ValidationError {
            issues: vec![validation::ValidationIssue {
                path: "$".to_string(),
                message: format!("body is not JSON: {}", e),
            }],
        })
    })
}

/// Pulls a human-readable message out of an error body
fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message"]
                .iter()
                .find_map(|field| value.get(field).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}
