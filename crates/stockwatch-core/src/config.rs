//! Configuration types for the stockwatch system
//!
//! This module defines all configuration structures used throughout the crate.
//! Reading them from the environment is the daemon's job; everything here is
//! plain data plus validation.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Placeholder substituted with the product id in URL templates
pub const PID_PLACEHOLDER: &str = "{pid}";

/// Order page probed for stock and linked from messages
pub const DEFAULT_ORDER_URL_TEMPLATE: &str = "https://bwh81.net/cart.php?a=add&pid={pid}";

/// Browser-like user agent; the order pages reject obvious bots
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Default state file name, resolved next to the executable by the daemon
pub const DEFAULT_STATE_FILE_NAME: &str = ".stock_state.json";

/// A tracked hosting offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Provider product id (the `pid` query parameter)
    pub id: u32,
    /// Display name
    pub name: String,
    /// Yearly price, kept as text exactly as displayed
    pub price: String,
    /// Short hardware summary
    pub description: String,
}

impl Product {
    /// Create a new product
    pub fn new(
        id: u32,
        name: impl Into<String>,
        price: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            price: price.into(),
            description: description.into(),
        }
    }

    /// Key under which this product is persisted in the state file
    pub fn state_key(&self) -> String {
        self.id.to_string()
    }

    /// Expand a URL template for this product
    pub fn order_url(&self, template: &str) -> String {
        template.replace(PID_PLACEHOLDER, &self.id.to_string())
    }
}

/// The built-in catalog of tracked offers
pub fn default_products() -> Vec<Product> {
    vec![
        Product::new(94, "CN2 GIA-E 10G", "49.99", "10G SSD / 0.5G RAM / 1Gbps"),
        Product::new(105, "CN2 GIA-E 20G", "89.99", "20G SSD / 1G RAM / 1Gbps"),
        Product::new(132, "CN2 GIA-E 20G", "89.90", "20G SSD / 1G RAM / 2.5Gbps"),
    ]
}

/// Main monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Products to check, in report order
    #[serde(default = "default_products")]
    pub products: Vec<Product>,

    /// Prober settings
    #[serde(default)]
    pub probe: ProbeConfig,

    /// State store settings
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Report formatting settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Run controller settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl MonitorConfig {
    /// Create a new configuration with the built-in catalog
    pub fn new() -> Self {
        Self {
            products: default_products(),
            probe: ProbeConfig::default(),
            state_store: StateStoreConfig::default(),
            report: ReportConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Replace the catalog
    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.products.is_empty() {
            return Err(crate::Error::config("No products configured"));
        }

        let mut seen = HashSet::new();
        for product in &self.products {
            if !seen.insert(product.id) {
                return Err(crate::Error::config(format!(
                    "Duplicate product id {}",
                    product.id
                )));
            }
        }

        self.probe.validate()?;
        self.report.offset()?;

        if self.engine.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Prober configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Order page URL with a `{pid}` placeholder
    #[serde(default = "default_order_url_template")]
    pub order_url_template: String,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between consecutive probes (in milliseconds)
    ///
    /// Keeps the run under the provider's rate limiting.
    #[serde(default = "default_probe_delay_ms")]
    pub delay_ms: u64,

    /// User-Agent header sent with every probe
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ProbeConfig {
    /// Validate the prober configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_url_template(&self.order_url_template)?;
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Probe timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            order_url_template: default_order_url_template(),
            timeout_secs: default_probe_timeout_secs(),
            delay_ms: default_probe_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn validate_url_template(template: &str) -> Result<(), crate::Error> {
    if !template.starts_with("https://") && !template.starts_with("http://") {
        return Err(crate::Error::config(format!(
            "Order URL template must use HTTP or HTTPS scheme. Got: {}",
            template
        )));
    }
    if !template.contains(PID_PLACEHOLDER) {
        return Err(crate::Error::config(format!(
            "Order URL template must contain {}. Got: {}",
            PID_PLACEHOLDER, template
        )));
    }
    Ok(())
}

/// State store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    Memory,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        StateStoreConfig::File {
            path: DEFAULT_STATE_FILE_NAME.to_string(),
        }
    }
}

/// Report formatting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Offset from UTC used for timestamps, in hours (Beijing time by default)
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl ReportConfig {
    /// Resolve the configured offset
    pub fn offset(&self) -> Result<FixedOffset, crate::Error> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                crate::Error::config(format!(
                    "UTC offset must be between -23 and 23 hours. Got: {}",
                    self.utc_offset_hours
                ))
            })
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

/// Run controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the monitor event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Telegram channel configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token
    /// ⚠️ NEVER log this value
    pub bot_token: String,

    /// Destination chat id
    pub chat_id: String,

    /// Bot API base URL
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,

    /// Log messages instead of sending them
    #[serde(default)]
    pub dry_run: bool,
}

impl TelegramConfig {
    /// Create a configuration pointing at the public Bot API
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: default_telegram_api_base(),
            timeout_secs: default_notify_timeout_secs(),
            dry_run: false,
        }
    }

    /// Validate the channel configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.bot_token.is_empty() {
            return Err(crate::Error::config("Telegram bot token cannot be empty"));
        }
        if self.chat_id.is_empty() {
            return Err(crate::Error::config("Telegram chat id cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Telegram timeout must be > 0"));
        }
        Ok(())
    }
}

// Custom Debug implementation that hides the bot token
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<REDACTED>")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Bark channel configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct BarkConfig {
    /// Device key
    /// ⚠️ NEVER log this value
    pub key: String,

    /// Push API base URL
    #[serde(default = "default_bark_api_base")]
    pub api_base: String,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,

    /// Log messages instead of sending them
    #[serde(default)]
    pub dry_run: bool,
}

impl BarkConfig {
    /// Create a configuration pointing at the public push API
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            api_base: default_bark_api_base(),
            timeout_secs: default_notify_timeout_secs(),
            dry_run: false,
        }
    }

    /// Validate the channel configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.key.is_empty() {
            return Err(crate::Error::config("Bark key cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Bark timeout must be > 0"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for BarkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarkConfig")
            .field("key", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

fn default_order_url_template() -> String {
    DEFAULT_ORDER_URL_TEMPLATE.to_string()
}

fn default_probe_timeout_secs() -> u64 {
    15
}

fn default_probe_delay_ms() -> u64 {
    1000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_utc_offset_hours() -> i32 {
    8
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_bark_api_base() -> String {
    "https://api.day.app".to_string()
}

fn default_notify_timeout_secs() -> u64 {
    10
}
