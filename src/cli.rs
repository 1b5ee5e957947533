//! Command-line interface parsing for shopfront
//!
//! With no subcommand the terminal storefront opens. Subcommands run once,
//! print to stdout and exit.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::cart::CartError;
use crate::catalog::{format_cents, ApiError, ServiceError};
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::donation::{
    parse_amount, DonateError, DonationError, MAX_DONATION_CENTS, MIN_DONATION_CENTS,
    PRESET_AMOUNTS_CENTS,
};
use crate::storage::StorageError;

/// Errors surfaced to the user by the command line
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid donation amount: {0}")]
    InvalidAmount(DonationError),

    /// The command needs the network but offline mode is on
    #[error("{0} needs the store to be reachable; drop --offline and try again")]
    Offline(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Catalog(#[from] ServiceError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Donate(#[from] DonateError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Terminal storefront and donation client
#[derive(Parser, Debug)]
#[command(name = "shopfront")]
#[command(about = "Browse the store, manage your cart, check out and donate from the terminal")]
#[command(version)]
pub struct Cli {
    /// Storefront API root [env: SHOPFRONT_API_URL]
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Use only cached and bundled data [env: SHOPFRONT_OFFLINE]
    #[arg(long, global = true)]
    pub offline: bool,

    /// Cache directory [env: SHOPFRONT_CACHE_DIR]
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory holding the cart and logs [env: SHOPFRONT_DATA_DIR]
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `shopfront=trace` [env: SHOPFRONT_LOG]
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List products
    Products {
        /// Only products in this category
        #[arg(long)]
        category: Option<String>,
        /// Ignore the cached listing and fetch it again
        #[arg(long)]
        refresh: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one product
    Product {
        id: String,
        #[arg(long)]
        json: bool,
    },

    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartCommand>,
    },

    /// Check out the cart and print the payment link
    Checkout {
        /// Receipt email
        #[arg(long)]
        email: Option<String>,
    },

    /// Donate and print the payment link
    ///
    /// Examples:
    ///   shopfront donate 25
    ///   shopfront donate '$1,000' --monthly --name "Sam Lee"
    #[command(after_help = donation_help())]
    Donate {
        /// Amount in dollars, e.g. 25, 25.50 or $1,000
        #[arg(value_parser = parse_amount_arg)]
        amount: u64,
        /// Repeat every month
        #[arg(long)]
        monthly: bool,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },

    /// Inspect or clear the product cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    /// Show the cart (default)
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Add a product
    Add {
        id: String,
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product
    Remove { id: String },
    /// Set a product's quantity; 0 removes it
    Set { id: String, quantity: u32 },
    /// Empty the cart
    Clear,
    /// Check the cart against current inventory
    Validate {
        /// Apply the fixes: drop unavailable lines, clamp quantities, update prices
        #[arg(long)]
        fix: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    /// Show cache location and entry counts
    Stats,
    /// Delete every cached entry
    Clear,
    /// Delete expired and unreadable entries
    Purge,
}

/// Parses a donation amount argument into cents, enforcing the donation limits
pub fn parse_amount_arg(s: &str) -> Result<u64, CliError> {
    let cents = parse_amount(s).map_err(CliError::InvalidAmount)?;
    if !(MIN_DONATION_CENTS..=MAX_DONATION_CENTS).contains(&cents) {
        return Err(CliError::InvalidAmount(DonationError::AmountOutOfRange(cents)));
    }
    Ok(cents)
}

/// Footer for `donate --help` listing the suggested amounts and limits
pub fn donation_help() -> String {
    let presets: Vec<String> = PRESET_AMOUNTS_CENTS.iter().map(|c| format_cents(*c)).collect();
    format!(
        "Suggested amounts: {}\nAccepted range: {} to {}",
        presets.join(", "),
        format_cents(MIN_DONATION_CENTS),
        format_cents(MAX_DONATION_CENTS)
    )
}
