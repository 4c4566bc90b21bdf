//! Currency rate value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single currency rate quoted against the provider's base currency.
///
/// `code` is the identity: a [`Snapshot`] never holds two entries with the same
/// code. Change figures are derived from `value` and `previous` on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub name: String,
    pub value: f64,
    pub previous: Option<f64>,
    /// User-entered quantity, only meaningful for the base display row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl Currency {
    pub fn new(code: &str, name: &str, value: f64, previous: Option<f64>) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            value,
            previous,
            amount: None,
        }
    }

    /// Row for the base currency itself, carrying the user's input amount.
    pub fn base(code: &str, name: &str, amount: f64) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            value: 1.0,
            previous: None,
            amount: Some(amount),
        }
    }

    pub fn change(&self) -> Option<f64> {
        self.previous.map(|previous| self.value - previous)
    }

    pub fn change_percent(&self) -> Option<f64> {
        match self.previous {
            Some(previous) if previous != 0.0 => Some((self.value - previous) / previous * 100.0),
            _ => None,
        }
    }

    pub fn direction(&self) -> Direction {
        match self.change() {
            Some(change) if change > 0.0 => Direction::Up,
            Some(change) if change < 0.0 => Direction::Down,
            _ => Direction::Flat,
        }
    }
}

/// Directional change indicator shown next to a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

/// The committed set of rates the dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Date reported by the rate source.
    pub date: String,
    pub currencies: Vec<Currency>,
    /// Local capture time of the last merge.
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            date: String::new(),
            currencies: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&Currency> {
        self.currencies.iter().find(|c| c.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
