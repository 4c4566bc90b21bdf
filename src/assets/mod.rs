//! Flag images for currency rows.
//!
//! Resolution is memoized per `(code, size)` for an hour and the image format
//! is negotiated once per process, both until [`AssetResolver::clear`].

pub mod http;

use crate::catalog;
use crate::core::cache::Cache;
use crate::store::memory::MemoryCache;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub use http::HttpImageLoader;

pub const ASSET_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    WebP,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::WebP => "webp",
            ImageFormat::Png => "png",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A loadable flag image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub code: String,
    pub country: String,
    pub format: ImageFormat,
    pub url: String,
}

/// Fetches images and reports which encodings the consumer can use.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Whether images in `format` are usable at all, checked at `size`.
    async fn supports(&self, format: ImageFormat, size: &str) -> bool;
    /// Succeeds when `url` is available.
    async fn load(&self, url: &str) -> Result<()>;
}

type AssetKey = (String, String);

pub struct AssetResolver {
    cdn_url: String,
    loader: Arc<dyn ImageLoader>,
    cache: MemoryCache<AssetKey, AssetRef>,
    /// One lock per key so concurrent lookups of the same flag load it once.
    computing: std::sync::Mutex<HashMap<AssetKey, Arc<Mutex<()>>>>,
    format: Mutex<Option<ImageFormat>>,
}

impl AssetResolver {
    pub fn new(cdn_url: &str, loader: Arc<dyn ImageLoader>) -> Self {
        Self {
            cdn_url: cdn_url.trim_end_matches('/').to_string(),
            loader,
            cache: MemoryCache::new(),
            computing: std::sync::Mutex::new(HashMap::new()),
            format: Mutex::new(None),
        }
    }

    pub fn url(&self, size: &str, country: &str, format: ImageFormat) -> String {
        format!("{}/{}/{}.{}", self.cdn_url, size, country, format)
    }

    /// The preferred format, checked on first use at the size being resolved.
    /// The decision then holds for every size until [`Self::clear`].
    pub async fn preferred_format(&self, size: &str) -> ImageFormat {
        let mut decided = self.format.lock().await;
        if let Some(format) = *decided {
            return format;
        }
        let format = if self.loader.supports(ImageFormat::WebP, size).await {
            ImageFormat::WebP
        } else {
            ImageFormat::Png
        };
        debug!(%format, "Negotiated flag image format");
        *decided = Some(format);
        format
    }

    fn key_lock(&self, key: &AssetKey) -> Arc<Mutex<()>> {
        let mut computing = self
            .computing
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(computing.entry(key.clone()).or_default())
    }

    /// Flag image for `code`, or `None` if it has no flag or none loads.
    pub async fn resolve(&self, code: &str, size: &str) -> Option<AssetRef> {
        let code = code.trim().to_uppercase();
        let key = (code.clone(), size.to_string());
        if let Some(hit) = self.cache.get(&key).await {
            return Some(hit);
        }

        let Some(country) = catalog::country_for(&code) else {
            debug!(code = %code, "No flag mapping");
            return None;
        };

        let lock = self.key_lock(&key);
        let _computing = lock.lock().await;
        // Filled while waiting for the lock
        if let Some(hit) = self.cache.get(&key).await {
            return Some(hit);
        }

        let asset = self.load(&code, country, size).await?;
        self.cache.put(key, asset.clone(), Some(ASSET_TTL)).await;
        Some(asset)
    }

    async fn load(&self, code: &str, country: &str, size: &str) -> Option<AssetRef> {
        let preferred = self.preferred_format(size).await;
        let mut formats = vec![preferred];
        if preferred != ImageFormat::Png {
            formats.push(ImageFormat::Png);
        }

        for format in formats {
            let url = self.url(size, country, format);
            match self.loader.load(&url).await {
                Ok(()) => {
                    return Some(AssetRef {
                        code: code.to_string(),
                        country: country.to_string(),
                        format,
                        url,
                    });
                }
                Err(e) => debug!(%url, error = %e, "Flag image unavailable"),
            }
        }
        warn!(code, "No flag image could be loaded");
        None
    }

    /// Forgets every resolved asset and the negotiated format.
    pub async fn clear(&self) {
        self.cache.clear().await;
        self.computing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self.format.lock().await = None;
    }
}
