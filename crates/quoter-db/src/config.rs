//! # Configuration
//!
//! Settings loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`QUOTER_*`)
//! 2. Defaults (this file)
//!
//! ## Environment Variables
//! | Variable                | Field                   | Example          |
//! |-------------------------|-------------------------|------------------|
//! | `QUOTER_DB_PATH`        | `database_path`         | `./quoter.db`    |
//! | `QUOTER_TAX_RATE`       | `default_tax_rate`      | `0.15`           |
//! | `QUOTER_SERIAL_RETRIES` | `serial_retry_attempts` | `5`              |
//! | `QUOTER_COMPANY_NAME`   | `company_name`          | `Al Noor Decor`  |
//! | `QUOTER_CURRENCY`       | `currency_code`         | `SAR`            |
//!
//! Configuration is read-only after initialization, so no mutex needed.

use std::path::PathBuf;

use quoter_core::validation::{parse_decimal, validate_tax_rate};
use quoter_core::DEFAULT_TAX_RATE;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pool::{DbConfig, DEFAULT_SERIAL_RETRY_ATTEMPTS};

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoterConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// VAT rate for new quotations, as a fraction (0.15 = 15%).
    pub default_tax_rate: Decimal,

    /// How many times minting a serial is retried on collision.
    pub serial_retry_attempts: u32,

    /// Printed on quotation headers.
    pub company_name: String,

    /// ISO 4217 code printed next to amounts.
    pub currency_code: String,
}

impl Default for QuoterConfig {
    /// Development defaults: `./quoter.db`, 15% VAT, SAR.
    fn default() -> Self {
        QuoterConfig {
            database_path: PathBuf::from("./quoter.db"),
            default_tax_rate: DEFAULT_TAX_RATE,
            serial_retry_attempts: DEFAULT_SERIAL_RETRY_ATTEMPTS,
            company_name: "Curtain Quoter".to_string(),
            currency_code: "SAR".to_string(),
        }
    }
}

impl QuoterConfig {
    /// Creates a configuration from `QUOTER_*` environment variables and
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`QuoterConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = QuoterConfig::default();

        if let Some(path) = lookup("QUOTER_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup("QUOTER_TAX_RATE") {
            let rate = parse_decimal("QUOTER_TAX_RATE", &raw)
                .map_err(|e| invalid("QUOTER_TAX_RATE", &raw, e.to_string()))?;
            validate_tax_rate(rate).map_err(|e| invalid("QUOTER_TAX_RATE", &raw, e.to_string()))?;
            config.default_tax_rate = rate;
        }

        if let Some(raw) = lookup("QUOTER_SERIAL_RETRIES") {
            let attempts: u32 = raw
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    invalid("QUOTER_SERIAL_RETRIES", &raw, e.to_string())
                })?;
            if attempts == 0 {
                return Err(invalid("QUOTER_SERIAL_RETRIES", &raw, "must be at least 1"));
            }
            config.serial_retry_attempts = attempts;
        }

        if let Some(name) = lookup("QUOTER_COMPANY_NAME") {
            config.company_name = name;
        }

        if let Some(code) = lookup("QUOTER_CURRENCY") {
            let code = code.trim().to_ascii_uppercase();
            if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(invalid("QUOTER_CURRENCY", &code, "expected a 3-letter code"));
            }
            config.currency_code = code;
        }

        Ok(config)
    }

    /// Builds the pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .serial_retry_attempts(self.serial_retry_attempts)
            .default_tax_rate(self.default_tax_rate)
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}
