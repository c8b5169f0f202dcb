// # Notifier Trait
//
// Defines the interface for delivering messages through an external
// messaging channel.
//
// ## Implementations
//
// - Telegram: `stockwatch-notify-telegram` crate
// - Bark (iOS push): `stockwatch-notify-bark` crate
//
// ## Usage
//
// ```rust,ignore
// use stockwatch_core::Notifier;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let notifier = /* Notifier implementation */;
//     let message = stockwatch_core::report::back_in_stock(&product, template);
//
//     if notifier.accepts(message.kind) {
//         notifier.send(&message).await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// What a message is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A product just came back in stock
    BackInStock,
    /// Full status digest of every tracked product
    DailyReport,
}

/// A rendered notification
///
/// Rich channels use `body` (Telegram Markdown). Push channels that only
/// show a short headline use `title` and `summary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Kind of message
    pub kind: MessageKind,
    /// Short headline
    pub title: String,
    /// Full Markdown text
    pub body: String,
    /// One-line plain text summary
    pub summary: String,
}

/// Trait for notification channel implementations
///
/// # Contract
///
/// - One delivery attempt per `send`; no retries. A failed send returns an
///   error, and the run controller logs it and moves on.
/// - A notifier never reads or writes notification state and never decides
///   whether a message should be sent; it only delivers what it is given.
/// - Credentials must never appear in logs or `Debug` output.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The channel accepted the message
    /// - `Err(Error)`: Transport failure or non-success response
    async fn send(&self, message: &Message) -> Result<(), crate::Error>;

    /// Whether this channel takes messages of the given kind
    fn accepts(&self, kind: MessageKind) -> bool {
        let _ = kind;
        true
    }

    /// Get the channel name (for logging/debugging)
    fn channel_name(&self) -> &'static str;
}
