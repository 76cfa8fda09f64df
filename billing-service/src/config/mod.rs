//! Configuration module for billing-service.

use rust_decimal::Decimal;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub accounting: AccountingConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Accounting knobs: the estimated-tax rate applied to net profit and the
/// account labels used for ledger shadow entries.
#[derive(Debug, Clone)]
pub struct AccountingConfig {
    pub tax_rate: Decimal,
    pub revenue_account: String,
    pub cash_account: String,
}

impl BillingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let tax_rate = env::var("BILLING_TAX_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| Decimal::new(18, 2));

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "billing-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: Secret::new(env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            accounting: AccountingConfig {
                tax_rate,
                revenue_account: env::var("BILLING_REVENUE_ACCOUNT")
                    .unwrap_or_else(|_| "Invoice Revenue".to_string()),
                cash_account: env::var("BILLING_CASH_ACCOUNT")
                    .unwrap_or_else(|_| "Cash".to_string()),
            },
        })
    }
}
