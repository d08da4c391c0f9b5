use std::env;
use std::str::FromStr;

use anyhow::Context;
use rust_decimal::Decimal;

use crate::domain::aggregates::style::DEFAULT_MAX_COMBINATIONS;
use crate::domain::aggregates::{ExpansionLimits, FlatFeeSchedule};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub nats_url: Option<String>,
    pub max_combinations: usize,
    pub delivery_fee: Decimal,
    pub safe_pickup_fee: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8083,
            nats_url: None,
            max_combinations: DEFAULT_MAX_COMBINATIONS,
            delivery_fee: Decimal::ZERO,
            safe_pickup_fee: Decimal::ZERO,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Config {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            nats_url: lookup("NATS_URL").filter(|url| !url.trim().is_empty()),
            max_combinations: parse_or(&lookup, "MAX_INVENTORY_COMBINATIONS", defaults.max_combinations)?,
            delivery_fee: parse_or(&lookup, "DELIVERY_FEE", defaults.delivery_fee)?,
            safe_pickup_fee: parse_or(&lookup, "SAFE_PICKUP_FEE", defaults.safe_pickup_fee)?,
        };
        config.validate()?;
        tracing::info!(port = config.port, max_combinations = config.max_combinations, nats = config.nats_url.is_some(), "Config: loaded");
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.max_combinations == 0 {
            return Err(anyhow::anyhow!("MAX_INVENTORY_COMBINATIONS must be greater than 0"));
        }
        if self.delivery_fee < Decimal::ZERO || self.safe_pickup_fee < Decimal::ZERO {
            return Err(anyhow::anyhow!("DELIVERY_FEE and SAFE_PICKUP_FEE must not be negative"));
        }
        Ok(())
    }

    pub fn limits(&self) -> ExpansionLimits {
        ExpansionLimits { max_combinations: self.max_combinations }
    }

    pub fn fee_schedule(&self) -> FlatFeeSchedule {
        FlatFeeSchedule { delivery: self.delivery_fee, safe_pickup: self.safe_pickup_fee }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.limits(), ExpansionLimits::default());
        assert!(config.nats_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[("PORT", "9000"), ("DELIVERY_FEE", "4.50"), ("MAX_INVENTORY_COMBINATIONS", "50")])).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.fee_schedule().delivery, Decimal::new(450, 2));
        assert_eq!(config.limits().max_combinations, 50);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("MAX_INVENTORY_COMBINATIONS", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SAFE_PICKUP_FEE", "-1")])).is_err());
    }
}
