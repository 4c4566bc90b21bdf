use super::{ImageFormat, ImageLoader};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

/// Flag used to find out whether the CDN serves a format.
const REFERENCE_COUNTRY: &str = "eu";

/// Checks image availability on the flag CDN with plain GET requests.
pub struct HttpImageLoader {
    client: reqwest::Client,
    cdn_url: String,
}

impl HttpImageLoader {
    pub fn new(cdn_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ratewatch/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            cdn_url: cdn_url.trim_end_matches('/').to_string(),
        })
    }

    fn reference_url(&self, size: &str, format: ImageFormat) -> String {
        format!("{}/{}/{}.{}", self.cdn_url, size, REFERENCE_COUNTRY, format)
    }
}

#[async_trait]
impl ImageLoader for HttpImageLoader {
    async fn supports(&self, format: ImageFormat, size: &str) -> bool {
        if format == ImageFormat::Png {
            return true;
        }
        let url = self.reference_url(size, format);
        let supported = self.load(&url).await.is_ok();
        debug!(%format, size, supported, "Checked image format");
        supported
    }

    async fn load(&self, url: &str) -> Result<()> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request {url}"))?
            .error_for_status()
            .with_context(|| format!("Image not available at {url}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetResolver;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount(server: &MockServer, route: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_webp_negotiated_when_served() {
        let server = MockServer::start().await;
        mount(&server, "/w80/eu.webp", 200).await;
        mount(&server, "/w80/us.webp", 200).await;

        let loader = HttpImageLoader::new(&server.uri()).unwrap();
        let resolver = AssetResolver::new(&server.uri(), Arc::new(loader));

        let asset = resolver.resolve("USD", "w80").await.unwrap();
        assert_eq!(asset.url, format!("{}/w80/us.webp", server.uri()));
    }

    #[tokio::test]
    async fn test_png_fallback_over_http() {
        let server = MockServer::start().await;
        mount(&server, "/w80/eu.webp", 200).await;
        mount(&server, "/w80/gb.webp", 404).await;
        mount(&server, "/w80/gb.png", 200).await;

        let loader = HttpImageLoader::new(&server.uri()).unwrap();
        let resolver = AssetResolver::new(&server.uri(), Arc::new(loader));

        let asset = resolver.resolve("GBP", "w80").await.unwrap();
        assert_eq!(asset.format, ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_png_only_cdn() {
        let server = MockServer::start().await;
        mount(&server, "/w80/eu.webp", 404).await;
        mount(&server, "/w80/jp.png", 200).await;

        let loader = HttpImageLoader::new(&server.uri()).unwrap();
        assert!(!loader.supports(ImageFormat::WebP, "w80").await);
        assert!(loader.supports(ImageFormat::Png, "w80").await);

        let resolver = AssetResolver::new(&server.uri(), Arc::new(loader));
        let asset = resolver.resolve("JPY", "w80").await.unwrap();
        assert_eq!(asset.url, format!("{}/w80/jp.png", server.uri()));
    }

    #[tokio::test]
    async fn test_format_checked_at_requested_size() {
        let server = MockServer::start().await;
        mount(&server, "/w160/eu.webp", 200).await;
        mount(&server, "/w160/us.webp", 200).await;

        let loader = HttpImageLoader::new(&server.uri()).unwrap();
        assert!(!loader.supports(ImageFormat::WebP, "w80").await);

        let resolver = AssetResolver::new(&server.uri(), Arc::new(loader));
        let asset = resolver.resolve("USD", "w160").await.unwrap();
        assert_eq!(asset.format, ImageFormat::WebP);
        assert_eq!(asset.url, format!("{}/w160/us.webp", server.uri()));
    }
}
