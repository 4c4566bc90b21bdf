use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::util::with_retry;
use crate::catalog;
use crate::core::cache::Cache;
use crate::core::{Currency, RateBatch, RateProvider};

const DAILY_DOCUMENT_KEY: &str = "daily_json";

/// Parsed daily document, shared between bulk and single fetches.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyRates {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Valute")]
    valute: HashMap<String, Valute>,
}

#[derive(Debug, Clone, Deserialize)]
struct Valute {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: f64,
    #[serde(rename = "Previous")]
    previous: Option<f64>,
}

impl DailyRates {
    fn currency(&self, code: &str) -> Option<Currency> {
        let valute = self.valute.get(code)?;
        // The feed's names are in the genitive for some currencies
        let name = catalog::lookup(code).map_or(valute.name.as_str(), |e| e.name);
        Some(Currency::new(code, name, valute.value, valute.previous))
    }
}

/// Central Bank of Russia daily rates feed. All quotes are against RUB.
pub struct CbrProvider {
    base_url: String,
    client: reqwest::Client,
    cache: Arc<dyn Cache<String, DailyRates>>,
    cache_ttl: Duration,
}

impl CbrProvider {
    pub fn new(
        base_url: &str,
        cache: Arc<dyn Cache<String, DailyRates>>,
        cache_ttl: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ratewatch/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            cache,
            cache_ttl,
        })
    }

    async fn daily(&self) -> Result<DailyRates> {
        let key = DAILY_DOCUMENT_KEY.to_string();
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let url = format!("{}/daily_json.js", self.base_url);
        debug!("Requesting daily rates from {}", url);

        let response = with_retry(
            || async { self.client.get(&url).send().await?.error_for_status() },
            2,
            500,
        )
        .await
        .with_context(|| format!("Failed to fetch daily rates from {url}"))?;

        let text = response
            .text()
            .await
            .context("Failed to read daily rates response")?;

        let daily: DailyRates = match serde_json::from_str(&text) {
            Ok(daily) => daily,
            Err(e) => {
                error!(error = ?e, response = %text, "Failed to parse daily rates response");
                return Err(anyhow!("Failed to parse daily rates response: {e}"));
            }
        };

        if !self.cache_ttl.is_zero() {
            self.cache.put(key, daily.clone(), Some(self.cache_ttl)).await;
        }
        Ok(daily)
    }
}

#[async_trait]
impl RateProvider for CbrProvider {
    #[instrument(name = "CbrBulkFetch", skip(self), fields(count = codes.len()))]
    async fn fetch_bulk(&self, codes: &[String]) -> Result<RateBatch> {
        let daily = self.daily().await?;
        let currencies: Vec<Currency> = codes
            .iter()
            .filter_map(|code| {
                let found = daily.currency(code);
                if found.is_none() {
                    debug!(code = %code, "Code not quoted by feed, skipping");
                }
                found
            })
            .collect();

        Ok(RateBatch {
            date: daily.date,
            currencies,
            timestamp: Utc::now(),
        })
    }

    #[instrument(name = "CbrSingleFetch", skip(self), fields(code = %code))]
    async fn fetch_one(&self, code: &str) -> Result<Option<Currency>> {
        let daily = self.daily().await?;
        Ok(daily.currency(code))
    }
}
