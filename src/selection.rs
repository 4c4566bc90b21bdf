//! The user's ordered list of tracked currency codes.

use crate::core::cache::KeyValueCollection;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Slot key the selection is persisted under.
pub const SELECTED_CURRENCIES_KEY: &str = "selected_currencies";

pub const DEFAULT_CURRENCIES: [&str; 2] = ["USD", "EUR"];

/// Ordered, duplicate-free list of codes, newest first.
///
/// Every mutation is written through to the slot before returning. Write
/// failures are logged and swallowed; the in-memory list stays authoritative.
pub struct SelectionStore {
    codes: Vec<String>,
    slot: Arc<dyn KeyValueCollection>,
}

impl SelectionStore {
    /// Reads the persisted selection, or the defaults when absent or corrupt.
    pub fn load(slot: Arc<dyn KeyValueCollection>) -> Self {
        let codes = match read_codes(slot.as_ref()) {
            Ok(Some(codes)) => {
                debug!(?codes, "Loaded persisted selection");
                codes
            }
            Ok(None) => {
                debug!("No persisted selection, using defaults");
                default_codes()
            }
            Err(e) => {
                warn!(error = %e, "Persisted selection unreadable, using defaults");
                default_codes()
            }
        };
        Self { codes, slot }
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }

    pub fn position(&self, code: &str) -> Option<usize> {
        self.codes.iter().position(|c| c == code)
    }

    /// Moves `code` to the front, inserting it if absent.
    pub fn add(&mut self, code: &str) {
        self.codes.retain(|c| c != code);
        self.codes.insert(0, code.to_string());
        self.persist();
    }

    /// Removes `code`; returns whether it was present.
    pub fn remove(&mut self, code: &str) -> bool {
        let before = self.codes.len();
        self.codes.retain(|c| c != code);
        let removed = self.codes.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    pub fn reset(&mut self) {
        self.codes = default_codes();
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = write_codes(self.slot.as_ref(), &self.codes) {
            warn!(error = %e, "Failed to persist selection, continuing in memory");
        }
    }
}

fn default_codes() -> Vec<String> {
    DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect()
}

fn read_codes(slot: &dyn KeyValueCollection) -> Result<Option<Vec<String>>> {
    let Some(raw) = slot.get(SELECTED_CURRENCIES_KEY)? else {
        return Ok(None);
    };
    let parsed: Vec<String> =
        serde_json::from_slice(&raw).context("Persisted selection is not a JSON list of codes")?;

    let mut codes: Vec<String> = Vec::with_capacity(parsed.len());
    for code in parsed {
        let code = code.trim().to_uppercase();
        if !code.is_empty() && !codes.contains(&code) {
            codes.push(code);
        }
    }
    Ok(Some(codes))
}

fn write_codes(slot: &dyn KeyValueCollection, codes: &[String]) -> Result<()> {
    let raw = serde_json::to_vec(codes)?;
    slot.put(SELECTED_CURRENCIES_KEY, &raw)
}
