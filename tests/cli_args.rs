//! Integration tests for the command-line interface
//!
//! Runs the built binary offline against temporary cache and data directories.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Runs the CLI with a clean `SHOPFRONT_*` environment
fn run_cli_with_env(args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_shopfront"));
    for var in [
        "SHOPFRONT_API_URL",
        "SHOPFRONT_OFFLINE",
        "SHOPFRONT_CACHE_DIR",
        "SHOPFRONT_DATA_DIR",
        "SHOPFRONT_TIMEOUT_SECS",
        "SHOPFRONT_PRODUCTS_TTL_SECS",
        "SHOPFRONT_PRODUCT_TTL_SECS",
        "SHOPFRONT_LOG",
    ] {
        command.env_remove(var);
    }
    command
        .args(args)
        .envs(env.iter().copied())
        .output()
        .expect("Failed to execute shopfront")
}

fn run_cli(args: &[&str]) -> Output {
    run_cli_with_env(args, &[])
}

/// Runs an offline command with its state kept under `dir`
fn run_offline(dir: &Path, args: &[&str]) -> Output {
    let cache = dir.join("cache");
    let data = dir.join("data");
    let mut full = vec![
        "--offline",
        "--cache-dir",
        cache.to_str().unwrap(),
        "--data-dir",
        data.to_str().unwrap(),
    ];
    full.extend_from_slice(args);
    run_cli(&full)
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("shopfront"), "Help should mention shopfront");
    for command in ["products", "cart", "checkout", "donate", "cache"] {
        assert!(stdout.contains(command), "Help should list {}", command);
    }
}

#[test]
fn test_donate_help_suggests_amounts() {
    let output = run_cli(&["donate", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Suggested amounts: $10.00, $25.00"), "{}", stdout);
    assert!(stdout.contains("$10,000.00"));
}

#[test]
fn test_invalid_donation_amount_prints_error_and_exits() {
    let output = run_cli(&["donate", "ten"]);
    assert!(!output.status.success(), "Expected invalid amount to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid donation amount"),
        "Should explain the bad amount: {}",
        stderr
    );
}

#[test]
fn test_offline_products_json_uses_bundled_catalog() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_offline(temp_dir.path(), &["products", "--json"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["source"], "fallback");
    assert!(!body["products"].as_array().unwrap().is_empty());
}

#[test]
fn test_offline_product_table_notes_source() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_offline(temp_dir.path(), &["products"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tote-bag"));
    assert!(stdout.contains("source:"));
}

#[test]
fn test_new_cart_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_offline(temp_dir.path(), &["cart"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Cart is empty");
}

#[test]
fn test_bundled_products_cannot_be_bought_offline() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_offline(temp_dir.path(), &["cart", "add", "tote-bag"]);
    assert!(!output.status.success());

    let output = run_offline(temp_dir.path(), &["cart"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Cart is empty");
}

#[test]
fn test_checkout_refused_offline() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_offline(temp_dir.path(), &["checkout"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--offline"));
}

#[test]
fn test_bad_environment_exits_with_usage_code() {
    let output = run_cli_with_env(&["cart"], &[("SHOPFRONT_TIMEOUT_SECS", "soon")]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("SHOPFRONT_TIMEOUT_SECS"));
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use shopfront::cli::{parse_amount_arg, CartCommand, Cli, Command};

    #[test]
    fn test_cli_no_args_opens_storefront() {
        let cli = Cli::parse_from(["shopfront"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_cart_set() {
        let cli = Cli::parse_from(["shopfront", "cart", "set", "logo-tee", "3"]);
        assert_eq!(
            cli.command,
            Some(Command::Cart {
                action: Some(CartCommand::Set {
                    id: "logo-tee".to_string(),
                    quantity: 3,
                }),
            })
        );
    }

    #[test]
    fn test_cli_checkout_email() {
        let cli = Cli::parse_from(["shopfront", "checkout", "--email", "a@b.co"]);
        assert_eq!(
            cli.command,
            Some(Command::Checkout {
                email: Some("a@b.co".to_string())
            })
        );
    }

    #[test]
    fn test_parse_amount_arg_limits() {
        assert_eq!(parse_amount_arg("1").unwrap(), 100);
        assert_eq!(parse_amount_arg("10,000").unwrap(), 1_000_000);
        assert!(parse_amount_arg("0.50").is_err());
        assert!(parse_amount_arg("10000.01").is_err());
    }
}
