// # Telegram Notification Channel
//
// This crate delivers stockwatch messages through the Telegram Bot API.
//
// ## Behavior
//
// - ✅ One HTTP request per message
// - ✅ Markdown body, link previews disabled
// - ✅ HTTP timeout configured (10 seconds by default)
// - ✅ Specific error messages for common HTTP status codes (400, 401, 403, 429, 5xx)
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic (a failed send waits for the next scheduled run)
// - ❌ NO state access (owned by the run controller)
//
// ## Security Requirements
//
// - Bot token NEVER appears in logs or error messages
// - Bot token MUST be provided via environment variables only
//
// ## API Reference
//
// - Send message: POST `/bot<token>/sendMessage` (form-encoded)
//   fields: `chat_id`, `text`, `parse_mode`, `disable_web_page_preview`

use async_trait::async_trait;
use serde::Deserialize;
use stockwatch_core::config::TelegramConfig;
use stockwatch_core::traits::{Message, MessageKind, Notifier};
use stockwatch_core::{Error, Result};
use std::time::Duration;

const CHANNEL: &str = "telegram";

/// Minimal view of a Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram notifier
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the notifier logs the message it would send and
/// makes no request.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the bot token.
pub struct TelegramNotifier {
    /// Bot token
    /// ⚠️ NEVER log this value
    bot_token: String,

    /// Destination chat id
    chat_id: String,

    /// Bot API base URL
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, log instead of sending
    dry_run: bool,
}

// Custom Debug implementation that hides the bot token
impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("bot_token", &"<REDACTED>")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl TelegramNotifier {
    /// Create a new Telegram notifier
    ///
    /// # Errors
    ///
    /// - Invalid configuration (empty token or chat id)
    /// - HTTP client construction failure
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        if config.dry_run {
            tracing::warn!("Telegram channel running in DRY-RUN mode - no messages will be sent");
        }

        Ok(Self {
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
            dry_run: config.dry_run,
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &Message) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send Telegram message to chat {}:\n{}",
                self.chat_id,
                message.body
            );
            return Ok(());
        }

        let form = [
            ("chat_id", self.chat_id.as_str()),
            ("text", message.body.as_str()),
            ("parse_mode", "Markdown"),
            ("disable_web_page_preview", "true"),
        ];

        // reqwest errors carry the URL, which embeds the token
        let response = self
            .client
            .post(self.send_message_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                Error::notify(
                    CHANNEL,
                    format!("HTTP request failed: {}", e.without_url()),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ApiResponse>()
                .await
                .ok()
                .and_then(|body| body.description)
                .unwrap_or_else(|| "no description".to_string());

            return Err(match status.as_u16() {
                400 => Error::notify(
                    CHANNEL,
                    format!("Bad request (check chat id and Markdown): {} - {}", status, detail),
                ),
                401 | 403 | 404 => Error::notify(
                    CHANNEL,
                    format!("Authentication failed: invalid bot token or chat access. Status: {}", status),
                ),
                429 => Error::notify(
                    CHANNEL,
                    format!("Rate limit exceeded. Status: {} - {}", status, detail),
                ),
                500..=599 => Error::notify(
                    CHANNEL,
                    format!("Telegram server error (transient): {} - {}", status, detail),
                ),
                _ => Error::notify(
                    CHANNEL,
                    format!("Failed to send message: {} - {}", status, detail),
                ),
            });
        }

        // A 200 with ok=false is still a failure
        match response.json::<ApiResponse>().await {
            Ok(body) if !body.ok => {
                return Err(Error::notify(
                    CHANNEL,
                    format!(
                        "API rejected message: {}",
                        body.description.unwrap_or_default()
                    ),
                ));
            }
            _ => {}
        }

        tracing::debug!("Telegram message delivered to chat {}", self.chat_id);
        Ok(())
    }

    fn accepts(&self, kind: MessageKind) -> bool {
        matches!(kind, MessageKind::BackInStock | MessageKind::DailyReport)
    }

    fn channel_name(&self) -> &'static str {
        CHANNEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> Message {
        Message {
            kind: MessageKind::BackInStock,
            title: "BWG In Stock!".to_string(),
            body: "🎉 *BWG Back in Stock!*".to_string(),
            summary: "CN2 GIA-E 10G $49.99/year".to_string(),
        }
    }

    fn config_for(server_uri: &str) -> TelegramConfig {
        TelegramConfig {
            api_base: server_uri.to_string(),
            ..TelegramConfig::new("123:secret", "4242")
        }
    }

    #[tokio::test]
    async fn test_sends_form_encoded_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot123:secret/sendMessage"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("chat_id=4242"))
            .and(body_string_contains("parse_mode=Markdown"))
            .and(body_string_contains("disable_web_page_preview=true"))
            .and(body_string_contains("text=%F0%9F%8E%89"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true, "result": {}})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let notifier = TelegramNotifier::new(&config_for(&mock_server.uri())).unwrap();
        notifier.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_is_error_without_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(
                serde_json::json!({"ok": false, "error_code": 401, "description": "Unauthorized"}),
            ))
            .mount(&mock_server)
            .await;

        let notifier = TelegramNotifier::new(&config_for(&mock_server.uri())).unwrap();
        let err = notifier.send(&message()).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("telegram"));
        assert!(text.contains("Authentication failed"));
        assert!(!text.contains("secret"));
    }

    #[tokio::test]
    async fn test_bad_request_carries_description() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&mock_server)
            .await;

        let notifier = TelegramNotifier::new(&config_for(&mock_server.uri())).unwrap();
        let err = notifier.send(&message()).await.unwrap_err();
        assert!(err.to_string().contains("chat not found"));
    }

    #[tokio::test]
    async fn test_ok_false_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "description": "message is too long"
            })))
            .mount(&mock_server)
            .await;

        let notifier = TelegramNotifier::new(&config_for(&mock_server.uri())).unwrap();
        let err = notifier.send(&message()).await.unwrap_err();
        assert!(err.to_string().contains("message is too long"));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_error_without_token() {
        let uri = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };

        let notifier = TelegramNotifier::new(&config_for(&uri)).unwrap();
        let err = notifier.send(&message()).await.unwrap_err();
        assert!(!err.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let config = TelegramConfig {
            dry_run: true,
            ..config_for(&mock_server.uri())
        };
        let notifier = TelegramNotifier::new(&config).unwrap();
        notifier.send(&message()).await.unwrap();
    }

    #[test]
    fn test_accepts_both_kinds() {
        let notifier = TelegramNotifier::new(&TelegramConfig::new("t", "c")).unwrap();
        assert!(notifier.accepts(MessageKind::BackInStock));
        assert!(notifier.accepts(MessageKind::DailyReport));
        assert_eq!(notifier.channel_name(), "telegram");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert!(TelegramNotifier::new(&TelegramConfig::new("", "c")).is_err());
        assert!(TelegramNotifier::new(&TelegramConfig::new("t", "")).is_err());
    }

    #[test]
    fn test_bot_token_not_exposed_in_debug() {
        let notifier =
            TelegramNotifier::new(&TelegramConfig::new("999:secret_token_12345", "c")).unwrap();

        let debug_str = format!("{:?}", notifier);
        assert!(!debug_str.contains("secret_token_12345"));
        assert!(debug_str.contains("TelegramNotifier"));
    }
}
