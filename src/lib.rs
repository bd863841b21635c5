//! Purchase-price history for supply items: normalize a raw ledger, filter
//! it, and derive the latest price per (item, region), a monthly trend and
//! a first-to-last price variation.
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;
