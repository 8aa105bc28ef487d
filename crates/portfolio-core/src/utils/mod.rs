//! Utility functions for formatting portfolio data for display.

pub mod format;

pub use format::{format_currency, format_market_value, format_quantity, holdings_table, truncate_string};
