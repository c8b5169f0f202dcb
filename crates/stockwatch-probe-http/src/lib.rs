// # HTTP Stock Prober
//
// This crate provides the order-page prober for the stockwatch system.
//
// ## Architecture
//
// One GET per product against the configured order URL template. A page
// that loads is classified by `stockwatch_core::traits::classify_page`;
// anything that keeps the page from loading (DNS, connect, timeout,
// non-2xx status, unreadable body) is logged and reported as `Unknown`.

use stockwatch_core::config::{ProbeConfig, Product};
use stockwatch_core::traits::{StockProber, StockStatus, classify_page};
use stockwatch_core::{Error, Result};

use std::time::Duration;

/// Order-page prober over HTTP
#[derive(Debug, Clone)]
pub struct HttpStockProber {
    /// Order URL with a `{pid}` placeholder
    url_template: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpStockProber {
    /// Create a new prober
    ///
    /// Fails only if the HTTP client cannot be built or the configuration is invalid.
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url_template: config.order_url_template.clone(),
            client,
        })
    }

    /// Fetch the order page of a product
    async fn fetch_page(&self, product: &Product) -> Result<String> {
        let url = product.order_url(&self.url_template);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::probe(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::probe(format!("HTTP error: {}", response.status())));
        }

        // Lossy decoding: stray bytes in the page must not fail the check
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::probe(format!("Failed to read response: {}", e)))?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait::async_trait]
impl StockProber for HttpStockProber {
    async fn probe(&self, product: &Product) -> StockStatus {
        match self.fetch_page(product).await {
            Ok(page) => classify_page(&page),
            Err(e) => {
                tracing::warn!("Error checking PID {}: {}", product.id, e);
                StockStatus::Unknown
            }
        }
    }

    fn prober_name(&self) -> &'static str {
        "http"
    }
}
