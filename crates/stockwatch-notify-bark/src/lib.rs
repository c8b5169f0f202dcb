// # Bark Notification Channel
//
// This crate pushes restock alerts to iOS devices through the Bark API.
//
// ## Behavior
//
// - ✅ Restock alerts only; the daily digest is too long for a push banner
// - ✅ Title and one-line summary travel as URL path segments
// - ✅ Time-sensitive level so the alert breaks through Focus modes
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic
//
// ## Security Requirements
//
// - Device key NEVER appears in logs or error messages
//
// ## API Reference
//
// - Push: GET `/<key>/<title>/<body>?sound=minuet&level=timeSensitive`

use async_trait::async_trait;
use reqwest::Url;
use stockwatch_core::config::BarkConfig;
use stockwatch_core::traits::{Message, MessageKind, Notifier};
use stockwatch_core::{Error, Result};
use std::time::Duration;

const CHANNEL: &str = "bark";
const SOUND: &str = "minuet";
const LEVEL: &str = "timeSensitive";

/// Bark push notifier
///
/// The Debug implementation does NOT expose the device key.
pub struct BarkNotifier {
    /// Device key
    /// ⚠️ NEVER log this value
    key: String,

    /// Push API base URL
    api_base: Url,

    client: reqwest::Client,

    dry_run: bool,
}

impl std::fmt::Debug for BarkNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarkNotifier")
            .field("key", &"<REDACTED>")
            .field("api_base", &self.api_base.as_str())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl BarkNotifier {
    /// Create a new Bark notifier
    ///
    /// # Errors
    ///
    /// - Empty key or zero timeout
    /// - API base that is not an absolute http(s) URL
    /// - HTTP client construction failure
    pub fn new(config: &BarkConfig) -> Result<Self> {
        config.validate()?;

        let api_base = Url::parse(&config.api_base)
            .map_err(|e| Error::config(format!("Invalid Bark API base URL: {}", e)))?;
        if api_base.cannot_be_a_base() {
            return Err(Error::config("Bark API base URL cannot carry a path"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        if config.dry_run {
            tracing::warn!("Bark channel running in DRY-RUN mode - no pushes will be sent");
        }

        Ok(Self {
            key: config.key.clone(),
            api_base,
            client,
            dry_run: config.dry_run,
        })
    }

    /// Build the push URL; every segment is percent-encoded
    fn push_url(&self, title: &str, body: &str) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&self.key).push(title).push(body);
        }
        url.query_pairs_mut()
            .append_pair("sound", SOUND)
            .append_pair("level", LEVEL);
        url
    }
}

#[async_trait]
impl Notifier for BarkNotifier {
    async fn send(&self, message: &Message) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would push Bark alert: {} - {}",
                message.title,
                message.summary
            );
            return Ok(());
        }

        let url = self.push_url(&message.title, &message.summary);

        // The key is a path segment; strip the URL from transport errors
        let response = self.client.get(url).send().await.map_err(|e| {
            Error::notify(CHANNEL, format!("HTTP request failed: {}", e.without_url()))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                400 | 404 => Error::notify(
                    CHANNEL,
                    format!("Push rejected (check device key). Status: {}", status),
                ),
                500..=599 => Error::notify(
                    CHANNEL,
                    format!("Bark server error (transient): {}", status),
                ),
                _ => Error::notify(CHANNEL, format!("Failed to push alert: {}", status)),
            });
        }

        tracing::debug!("Bark alert delivered");
        Ok(())
    }

    fn accepts(&self, kind: MessageKind) -> bool {
        kind == MessageKind::BackInStock
    }

    fn channel_name(&self) -> &'static str {
        CHANNEL
    }
}
