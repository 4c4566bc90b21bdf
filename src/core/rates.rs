//! Rate provider abstraction

use crate::core::currency::Currency;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Result of a bulk fetch. `currencies` holds only the codes the source knows.
#[derive(Debug, Clone)]
pub struct RateBatch {
    pub date: String,
    pub currencies: Vec<Currency>,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches rates for all `codes`. Unknown codes are skipped, not errors.
    async fn fetch_bulk(&self, codes: &[String]) -> Result<RateBatch>;

    /// Fetches one code; `Ok(None)` when the source does not quote it.
    async fn fetch_one(&self, code: &str) -> Result<Option<Currency>>;
}
