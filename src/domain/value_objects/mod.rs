//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key an attribute contributes to an inventory row's selection.
///
/// Saved attributes are keyed by id; unsaved ones fall back to their
/// zero-based position, e.g. `attribute-0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeKey(String);

impl AttributeKey {
    pub fn resolve(id: Option<&str>, position: usize) -> Self {
        match id.filter(|id| !id.is_empty()) {
            Some(id) => Self(id.to_string()),
            None => Self(format!("attribute-{}", position)),
        }
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// CSA delivery frequency, written `"<period>-<unit>"` (`"2-week"`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsaFrequency { period: Decimal, unit: Option<String> }

impl CsaFrequency {
    pub fn new(period: Decimal, unit: Option<String>) -> Self {
        let period = if period > Decimal::ZERO { period } else { Decimal::ONE };
        Self { period, unit }
    }

    /// Strict parse. A missing, empty or zero period means one.
    pub fn parse(raw: &str) -> Result<Self, FrequencyError> {
        let (head, unit) = match raw.split_once('-') {
            Some((head, unit)) => (head.trim(), Some(unit.trim()).filter(|u| !u.is_empty()).map(str::to_string)),
            None => (raw.trim(), None),
        };
        if head.is_empty() { return Ok(Self::new(Decimal::ONE, unit)); }
        let period = Decimal::from_str(head).map_err(|_| FrequencyError::Period(head.to_string()))?;
        Ok(Self::new(period, unit))
    }

    /// Lenient parse: an unparseable period falls back to one and the
    /// error is handed back for reporting.
    pub fn parse_lenient(raw: &str) -> (Self, Option<FrequencyError>) {
        match Self::parse(raw) {
            Ok(freq) => (freq, None),
            Err(e) => (Self::new(Decimal::ONE, None), Some(e)),
        }
    }

    pub fn period(&self) -> Decimal { self.period }
    pub fn unit(&self) -> Option<&str> { self.unit.as_deref() }

    /// Whole cycles that fit in `duration`. `None` when the period is so
    /// small the count leaves the `Decimal` range.
    pub fn cycles(&self, duration: u32) -> Option<Decimal> {
        Decimal::from(duration).checked_div(self.period).map(|c| c.floor())
    }
}

impl Default for CsaFrequency { fn default() -> Self { Self::new(Decimal::ONE, None) } }

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrequencyError {
    #[error("unparseable frequency period '{0}'")]
    Period(String),
}

/// Rounds a currency amount to cents for display.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
