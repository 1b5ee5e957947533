//! One-shot subcommands
//!
//! Each command builds what it needs from the [`Config`], does its work and
//! writes human-readable (or JSON) output to the given writer.

use serde_json::json;
use std::io::Write;

use crate::cart::{CartStore, CartValidation};
use crate::catalog::{format_cents, CatalogService, DataSource, Product};
use crate::checkout::{self, CheckoutError};
use crate::cli::{CacheCommand, CartCommand, CliError, Command};
use crate::config::Config;
use crate::donation::{self, DonationRequest};

/// Runs a single subcommand
pub async fn run<W: Write>(command: Command, config: &Config, out: &mut W) -> Result<(), CliError> {
    let catalog = config.build_catalog()?;

    match command {
        Command::Products {
            category,
            refresh,
            json,
        } => {
            let mut listing = if refresh {
                catalog.refresh_products().await
            } else {
                catalog.products().await
            };
            if let Some(category) = &category {
                listing = listing.in_category(category);
            }
            if json {
                let body = json!({ "source": listing.source, "products": listing.data });
                writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
            } else {
                write_product_table(out, &listing.data)?;
                write_source(out, listing.source)?;
            }
        }

        Command::Product { id, json } => {
            let product = catalog.product(&id).await?;
            if json {
                let body = json!({ "source": product.source, "product": product.data });
                writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
            } else {
                write_product(out, &product.data)?;
                write_source(out, product.source)?;
            }
        }

        Command::Cart { action } => {
            let mut carts = CartStore::open(config.data_store()?)?;
            run_cart(action.unwrap_or(CartCommand::Show { json: false }), &catalog, &mut carts, out)
                .await?;
        }

        Command::Checkout { email } => {
            if catalog.is_offline() {
                return Err(CliError::Offline("Checkout"));
            }
            let mut carts = CartStore::open(config.data_store()?)?;
            match checkout::checkout(&catalog, &mut carts, email.as_deref()).await {
                Ok(session) => {
                    writeln!(
                        out,
                        "Total {}. Complete payment at:\n{}",
                        format_cents(carts.cart().subtotal_cents()),
                        session.url
                    )?;
                }
                Err(CheckoutError::CartChanged(validation)) => {
                    write_issues(out, &validation)?;
                    writeln!(out, "Your cart was updated:")?;
                    write_cart(out, &carts)?;
                    return Err(CheckoutError::CartChanged(validation).into());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Command::Donate {
            amount,
            monthly,
            name,
            email,
            message,
        } => {
            if catalog.is_offline() {
                return Err(CliError::Offline("Donating"));
            }
            let mut request = DonationRequest::new(amount);
            if monthly {
                request = request.monthly();
            }
            if let Some(name) = name {
                request = request.donor_name(name);
            }
            if let Some(email) = email {
                request = request.email(email);
            }
            if let Some(message) = message {
                request = request.message(message);
            }
            let frequency = request.frequency;
            let session = donation::donate(catalog.client(), request).await?;
            writeln!(
                out,
                "Thank you! Complete your {} donation of {} at:\n{}",
                frequency,
                format_cents(amount),
                session.url
            )?;
        }

        Command::Cache { action } => run_cache(action, &catalog, out)?,
    }
    Ok(())
}

async fn run_cart<W: Write>(
    action: CartCommand,
    catalog: &CatalogService,
    carts: &mut CartStore,
    out: &mut W,
) -> Result<(), CliError> {
    match action {
        CartCommand::Show { json } => {
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(carts.cart())?)?;
            } else {
                write_cart(out, carts)?;
            }
        }
        CartCommand::Add { id, quantity } => {
            let product = catalog.product(&id).await?;
            if !product.source.is_current() {
                tracing::warn!(id, source = %product.source, "Adding product using offline data");
            }
            let item = carts.add(&product.data, quantity)?;
            writeln!(
                out,
                "Added {} x {} ({} each)",
                quantity,
                item.name,
                format_cents(item.unit_price_cents)
            )?;
            write_subtotal(out, carts)?;
        }
        CartCommand::Remove { id } => {
            let item = carts.remove(&id)?;
            writeln!(out, "Removed {}", item.name)?;
            write_subtotal(out, carts)?;
        }
        CartCommand::Set { id, quantity } => {
            carts.set_quantity(&id, quantity)?;
            match carts.cart().get(&id) {
                Some(item) => writeln!(out, "{} quantity set to {}", item.name, item.quantity)?,
                None => writeln!(out, "Removed {}", id)?,
            }
            write_subtotal(out, carts)?;
        }
        CartCommand::Clear => {
            carts.clear()?;
            writeln!(out, "Cart cleared")?;
        }
        CartCommand::Validate { fix } => {
            let validation = carts.validate_and_reconcile(catalog, fix).await?;
            if validation.is_valid() {
                writeln!(out, "Cart is up to date with {} inventory", validation.source)?;
            } else {
                write_issues(out, &validation)?;
                if !validation.is_authoritative() {
                    writeln!(out, "Cart left unchanged; fixes need the store to be reachable")?;
                } else if fix {
                    writeln!(out, "Cart updated:")?;
                    write_cart(out, carts)?;
                } else {
                    writeln!(out, "Run `shopfront cart validate --fix` to apply these changes")?;
                }
            }
            if !validation.is_authoritative() {
                writeln!(
                    out,
                    "Note: checked against {} data; stock and prices may have changed",
                    validation.source
                )?;
            }
        }
    }
    Ok(())
}

fn run_cache<W: Write>(action: CacheCommand, catalog: &CatalogService, out: &mut W) -> Result<(), CliError> {
    let cache = catalog.cache();
    match action {
        CacheCommand::Stats => {
            let stats = cache.stats();
            match cache.disk() {
                Some(disk) => {
                    writeln!(out, "Cache directory: {}", disk.dir().display())?;
                    writeln!(out, "Entries on disk: {}", stats.disk_entries.unwrap_or(0))?;
                }
                None => writeln!(out, "No cache directory; caching in memory only")?,
            }
        }
        CacheCommand::Clear => {
            let removed = catalog.invalidate_all()?;
            writeln!(out, "Removed {} cached entries", removed)?;
        }
        CacheCommand::Purge => {
            let removed = match cache.disk() {
                Some(disk) => disk.purge_expired()?,
                None => 0,
            };
            writeln!(out, "Removed {} expired entries", removed)?;
        }
    }
    Ok(())
}

fn write_product_table<W: Write>(out: &mut W, products: &[Product]) -> std::io::Result<()> {
    if products.is_empty() {
        return writeln!(out, "No products found");
    }
    writeln!(out, "{:<16} {:<28} {:>10} {:>6}  {}", "ID", "NAME", "PRICE", "STOCK", "CATEGORY")?;
    for product in products {
        let stock = if product.is_available() {
            product.inventory.to_string()
        } else {
            "-".to_string()
        };
        writeln!(
            out,
            "{:<16} {:<28} {:>10} {:>6}  {}",
            product.id,
            truncate(&product.name, 28),
            product.display_price(),
            stock,
            product.category
        )?;
    }
    Ok(())
}

fn write_product<W: Write>(out: &mut W, product: &Product) -> std::io::Result<()> {
    writeln!(out, "{} ({})", product.name, product.id)?;
    writeln!(out, "Price:    {}", product.display_price())?;
    writeln!(out, "Category: {}", product.category)?;
    let stock = match (product.is_active, product.inventory) {
        (false, _) => "no longer sold".to_string(),
        (true, 0) => "out of stock".to_string(),
        (true, n) => format!("{} in stock", n),
    };
    writeln!(out, "Stock:    {}", stock)?;
    if !product.description.is_empty() {
        writeln!(out, "\n{}", product.description)?;
    }
    Ok(())
}

fn write_cart<W: Write>(out: &mut W, carts: &CartStore) -> std::io::Result<()> {
    let cart = carts.cart();
    if cart.is_empty() {
        return writeln!(out, "Cart is empty");
    }
    for item in &cart.items {
        writeln!(
            out,
            "{:>3} x {:<28} {:>10}  {:>10}",
            item.quantity,
            truncate(&item.name, 28),
            format_cents(item.unit_price_cents),
            format_cents(item.line_total_cents())
        )?;
    }
    write_subtotal(out, carts)
}

fn write_subtotal<W: Write>(out: &mut W, carts: &CartStore) -> std::io::Result<()> {
    let cart = carts.cart();
    writeln!(
        out,
        "Subtotal: {} ({} item{})",
        format_cents(cart.subtotal_cents()),
        cart.item_count(),
        if cart.item_count() == 1 { "" } else { "s" }
    )
}

fn write_issues<W: Write>(out: &mut W, validation: &CartValidation) -> std::io::Result<()> {
    for issue in &validation.issues {
        writeln!(out, "  ! {}", issue)?;
    }
    Ok(())
}

fn write_source<W: Write>(out: &mut W, source: DataSource) -> std::io::Result<()> {
    if source != DataSource::Live {
        writeln!(out, "\n(source: {})", source)?;
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn offline_config(temp_dir: &TempDir) -> Config {
        Config {
            api_url: "http://127.0.0.1:9/api".to_string(),
            offline: true,
            cache_dir: Some(temp_dir.path().join("cache")),
            data_dir: Some(temp_dir.path().join("data")),
            ..Config::default()
        }
    }

    async fn run_to_string(command: Command, config: &Config) -> Result<String, CliError> {
        let mut out = Vec::new();
        run(command, config, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[tokio::test]
    async fn test_offline_products_table_names_source() {
        let temp_dir = TempDir::new().unwrap();
        let command = Command::Products {
            category: None,
            refresh: false,
            json: false,
        };

        let output = run_to_string(command, &offline_config(&temp_dir)).await.unwrap();

        assert!(output.contains("logo-tee"));
        assert!(output.contains("$25.00"));
        assert!(output.contains("offline (bundled catalog)"));
    }

    #[tokio::test]
    async fn test_products_json_with_category() {
        let temp_dir = TempDir::new().unwrap();
        let command = Command::Products {
            category: Some("apparel".to_string()),
            refresh: true,
            json: true,
        };

        let output = run_to_string(command, &offline_config(&temp_dir)).await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(body["source"], "fallback");
        let products = body["products"].as_array().unwrap();
        assert!(!products.is_empty());
        assert!(products.iter().all(|p| p["category"] == "apparel"));
    }

    #[tokio::test]
    async fn test_offline_fallback_products_cannot_be_added() {
        let temp_dir = TempDir::new().unwrap();
        let command = Command::Cart {
            action: Some(CartCommand::Add {
                id: "logo-tee".to_string(),
                quantity: 1,
            }),
        };

        let result = run_to_string(command, &offline_config(&temp_dir)).await;

        assert!(matches!(result, Err(CliError::Cart(_))));
    }

    #[tokio::test]
    async fn test_offline_fix_leaves_cart_alone() {
        let temp_dir = TempDir::new().unwrap();
        let config = offline_config(&temp_dir);
        let mut carts = CartStore::open(config.data_store().unwrap()).unwrap();
        carts.add(&crate::cart::tests::product("logo-tee", 2500, 10), 2).unwrap();

        let command = Command::Cart {
            action: Some(CartCommand::Validate { fix: true }),
        };
        let output = run_to_string(command, &config).await.unwrap();

        assert!(output.contains("out of stock"));
        assert!(output.contains("Cart left unchanged"));
        let reopened = CartStore::open(config.data_store().unwrap()).unwrap();
        assert_eq!(reopened.cart().get("logo-tee").unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_empty_cart_show() {
        let temp_dir = TempDir::new().unwrap();
        let output = run_to_string(Command::Cart { action: None }, &offline_config(&temp_dir))
            .await
            .unwrap();
        assert_eq!(output.trim(), "Cart is empty");
    }

    #[tokio::test]
    async fn test_checkout_and_donate_refuse_offline() {
        let temp_dir = TempDir::new().unwrap();
        let config = offline_config(&temp_dir);

        let checkout = run_to_string(Command::Checkout { email: None }, &config).await;
        assert!(matches!(checkout, Err(CliError::Offline(_))));

        let donate = Command::Donate {
            amount: 2_500,
            monthly: false,
            name: None,
            email: None,
            message: None,
        };
        assert!(matches!(run_to_string(donate, &config).await, Err(CliError::Offline(_))));
    }

    #[tokio::test]
    async fn test_cache_clear_and_stats() {
        let temp_dir = TempDir::new().unwrap();
        let config = offline_config(&temp_dir);
        let manager = config.cache_manager().unwrap();
        manager
            .write("products", &Vec::<Product>::new(), std::time::Duration::from_secs(60))
            .unwrap();

        let stats = run_to_string(Command::Cache { action: CacheCommand::Stats }, &config)
            .await
            .unwrap();
        assert!(stats.contains("Entries on disk: 1"));

        let cleared = run_to_string(Command::Cache { action: CacheCommand::Clear }, &config)
            .await
            .unwrap();
        assert!(cleared.contains("Removed 1 cached entries"));
    }
}
