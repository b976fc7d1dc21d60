//! Application configuration loaded from environment variables.

use crate::account::Money;

/// Demo configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `BANK_TRACK_AGGREGATES`: run the bus with an identity map (default: `true`)
/// - `BANK_OPENING_BALANCE`: opening balance of demo accounts in cents (default: `100`)
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub track_aggregates: bool,
    pub opening_balance: Money,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            track_aggregates: std::env::var("BANK_TRACK_AGGREGATES")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.track_aggregates),
            opening_balance: std::env::var("BANK_OPENING_BALANCE")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .map(Money::from_cents)
                .unwrap_or(defaults.opening_balance),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            track_aggregates: true,
            opening_balance: Money::from_cents(100),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
