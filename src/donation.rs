//! Donations
//!
//! Amounts are entered as dollar strings and kept as integer cents from then on.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::catalog::{format_cents, ApiClient, ApiError};
use crate::checkout::{is_valid_email, CheckoutSession};

/// Smallest accepted donation, in cents
pub const MIN_DONATION_CENTS: u64 = 100;

/// Largest accepted donation, in cents
pub const MAX_DONATION_CENTS: u64 = 1_000_000;

/// Suggested amounts offered in the UI, in cents
pub const PRESET_AMOUNTS_CENTS: [u64; 4] = [1_000, 2_500, 5_000, 10_000];

/// Longest accepted donor message, in characters
pub const MAX_MESSAGE_LEN: usize = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DonationError {
    #[error("'{0}' is not a valid amount")]
    InvalidAmount(String),

    #[error("{}", out_of_range_message(.0))]
    AmountOutOfRange(u64),

    #[error("Invalid email address '{0}'")]
    InvalidEmail(String),

    #[error("Message is longer than {} characters", MAX_MESSAGE_LEN)]
    MessageTooLong,
}

fn out_of_range_message(cents: &u64) -> String {
    format!(
        "Donation must be between {} and {}, got {}",
        format_cents(MIN_DONATION_CENTS),
        format_cents(MAX_DONATION_CENTS),
        format_cents(*cents)
    )
}

/// Errors from submitting a donation
#[derive(Debug, Error)]
pub enum DonateError {
    #[error(transparent)]
    Invalid(#[from] DonationError),

    #[error("Donation failed: {0}")]
    Api(#[from] ApiError),
}

/// How often the donation recurs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationFrequency {
    #[default]
    OneTime,
    Monthly,
}

impl fmt::Display for DonationFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DonationFrequency::OneTime => write!(f, "one-time"),
            DonationFrequency::Monthly => write!(f, "monthly"),
        }
    }
}

/// Body of a donation session request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    #[serde(rename = "amount")]
    pub amount_cents: u64,
    pub frequency: DonationFrequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DonationRequest {
    /// A one-time donation with no donor details
    pub fn new(amount_cents: u64) -> Self {
        Self {
            amount_cents,
            frequency: DonationFrequency::OneTime,
            donor_name: None,
            email: None,
            message: None,
        }
    }

    pub fn monthly(mut self) -> Self {
        self.frequency = DonationFrequency::Monthly;
        self
    }

    pub fn donor_name(mut self, name: impl Into<String>) -> Self {
        self.donor_name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Checks limits and normalizes optional text fields
    ///
    /// Blank optional fields are dropped rather than sent as empty strings.
    pub fn validated(mut self) -> Result<Self, DonationError> {
        if !(MIN_DONATION_CENTS..=MAX_DONATION_CENTS).contains(&self.amount_cents) {
            return Err(DonationError::AmountOutOfRange(self.amount_cents));
        }
        self.donor_name = non_blank(self.donor_name);
        self.email = non_blank(self.email);
        self.message = non_blank(self.message);
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                return Err(DonationError::InvalidEmail(email.clone()));
            }
        }
        if self.message.as_ref().is_some_and(|m| m.chars().count() > MAX_MESSAGE_LEN) {
            return Err(DonationError::MessageTooLong);
        }
        Ok(self)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a dollar amount such as `25`, `25.5` or `$1,000.00` into cents
///
/// At most two decimal places are accepted.
pub fn parse_amount(input: &str) -> Result<u64, DonationError> {
    let invalid = || DonationError::InvalidAmount(input.to_string());
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('$').unwrap_or(trimmed).replace(',', "");

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits.as_str(), ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if fraction.len() > 2 || !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let dollars: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let cents: u64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
        _ => fraction.parse().map_err(|_| invalid())?,
    };
    dollars
        .checked_mul(100)
        .and_then(|d| d.checked_add(cents))
        .ok_or_else(invalid)
}

/// Validates the request and opens a payment session for it
pub async fn donate(client: &ApiClient, request: DonationRequest) -> Result<CheckoutSession, DonateError> {
    let request = request.validated()?;
    let session = client.create_donation_session(&request).await?;
    tracing::info!(
        session_id = %session.session_id,
        amount_cents = request.amount_cents,
        frequency = %request.frequency,
        "Donation session created"
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_forms() {
        assert_eq!(parse_amount("25"), Ok(2_500));
        assert_eq!(parse_amount("25.5"), Ok(2_550));
        assert_eq!(parse_amount("25.05"), Ok(2_505));
        assert_eq!(parse_amount("$1,000.00"), Ok(100_000));
        assert_eq!(parse_amount(" $10 "), Ok(1_000));
        assert_eq!(parse_amount(".50"), Ok(50));
        assert_eq!(parse_amount("7."), Ok(700));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        for input in ["", "$", ".", "abc", "-5", "1.234", "1.2.3", "12e3", "$$5"] {
            assert!(
                matches!(parse_amount(input), Err(DonationError::InvalidAmount(_))),
                "{:?} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_parse_amount_overflow() {
        assert!(parse_amount("999999999999999999999").is_err());
    }

    #[test]
    fn test_amount_limits() {
        assert!(DonationRequest::new(MIN_DONATION_CENTS).validated().is_ok());
        assert!(DonationRequest::new(MAX_DONATION_CENTS).validated().is_ok());
        assert_eq!(
            DonationRequest::new(99).validated(),
            Err(DonationError::AmountOutOfRange(99))
        );
        assert_eq!(
            DonationRequest::new(MAX_DONATION_CENTS + 1).validated(),
            Err(DonationError::AmountOutOfRange(MAX_DONATION_CENTS + 1))
        );
    }

    #[test]
    fn test_presets_are_within_limits() {
        for cents in PRESET_AMOUNTS_CENTS {
            assert!(DonationRequest::new(cents).validated().is_ok());
        }
    }

    #[test]
    fn test_optional_fields_normalized() {
        let request = DonationRequest::new(2_500)
            .donor_name("  ")
            .email(" friend@example.org ")
            .message("Keep it up")
            .validated()
            .unwrap();

        assert_eq!(request.donor_name, None);
        assert_eq!(request.email.as_deref(), Some("friend@example.org"));
    }

    #[test]
    fn test_invalid_email_and_long_message() {
        assert!(matches!(
            DonationRequest::new(2_500).email("nope").validated(),
            Err(DonationError::InvalidEmail(_))
        ));
        assert_eq!(
            DonationRequest::new(2_500)
                .message("x".repeat(MAX_MESSAGE_LEN + 1))
                .validated(),
            Err(DonationError::MessageTooLong)
        );
    }

    #[test]
    fn test_wire_format() {
        let request = DonationRequest::new(5_000).monthly().donor_name("Sam");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["amount"], 5_000);
        assert_eq!(json["frequency"], "monthly");
        assert_eq!(json["donorName"], "Sam");
        assert!(json.get("email").is_none());
    }

    #[test]
    fn test_error_message_formats_amounts() {
        assert_eq!(
            DonationError::AmountOutOfRange(50).to_string(),
            "Donation must be between $1.00 and $10,000.00, got $0.50"
        );
    }
}
