//! shopfront library
//!
//! Client-side catalog caching, cart management, checkout and donations for the
//! storefront API. The binary wraps these in a terminal UI and one-shot commands.

pub mod app;
pub mod cache;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dedup;
pub mod donation;
pub mod logging;
pub mod storage;
pub mod ui;
pub mod validation;
