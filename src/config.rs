//! Environment-driven configuration

use std::time::Duration;

use anyhow::Context;
use rust_decimal::Decimal;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Unset runs the service on the in-memory store (ephemeral).
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    /// Unset charges through the sandbox gateway.
    pub payment_gateway_url: Option<String>,
    pub sentiment_url: Option<String>,
    /// Platform currency; all catalog prices and balances use it.
    pub currency: String,
    /// Commission withheld from provider earnings, in percent.
    pub commission_rate: Decimal,
    pub gateway_timeout: Duration,
    pub sentiment_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(v) => v.parse().context("PORT must be a port number")?,
            Err(_) => 8084,
        };
        let commission_rate = match std::env::var("COMMISSION_RATE") {
            Ok(v) => v.parse().ok().context("COMMISSION_RATE must be a percentage")?,
            Err(_) => Decimal::new(15, 0),
        };
        let gateway_timeout = env_secs("PAYMENT_GATEWAY_TIMEOUT_SECS", 20)?;
        let sentiment_timeout = env_secs("SENTIMENT_TIMEOUT_SECS", 3)?;
        Ok(Self {
            port,
            database_url: std::env::var("DATABASE_URL").ok(),
            nats_url: std::env::var("NATS_URL").ok(),
            payment_gateway_url: std::env::var("PAYMENT_GATEWAY_URL").ok(),
            sentiment_url: std::env::var("SENTIMENT_URL").ok(),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "SAR".to_string()),
            commission_rate,
            gateway_timeout,
            sentiment_timeout,
        })
    }
}

fn env_secs(name: &str, default: u64) -> anyhow::Result<Duration> {
    let secs = match std::env::var(name) {
        Ok(v) => v.parse().with_context(|| format!("{name} must be seconds"))?,
        Err(_) => default,
    };
    Ok(Duration::from_secs(secs))
}
