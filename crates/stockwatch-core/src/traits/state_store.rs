// # State Store Trait
//
// Defines the interface for persisting notification state between runs.
//
// ## Purpose
//
// The state store remembers, per product, whether a "back in stock"
// notification was already sent for the current in-stock streak. That flag
// is the only thing that survives from one scheduled run to the next.
//
// ## Implementations
//
// - File-based: JSON file next to the executable
// - In-memory: tests and throwaway runs
//
// ## Usage
//
// ```rust,ignore
// use stockwatch_core::StateStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* StateStore implementation */;
//
//     let mut state = store.load().await?;
//     state.mark_notified("94", "2025-01-09 20:00:00");
//     store.save(&state).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Notification record for one product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// A notification was sent for the current in-stock streak
    pub notified: bool,
    /// When the last notification was sent (report time zone)
    pub timestamp: String,
}

/// Persisted notification state, keyed by product id
///
/// Serializes as a flat JSON object: `{"94": {"notified": true, "timestamp": "..."}}`.
/// Entries are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationState {
    records: BTreeMap<String, NotificationRecord>,
}

impl NotificationState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the record for a product
    pub fn get(&self, key: &str) -> Option<&NotificationRecord> {
        self.records.get(key)
    }

    /// Whether a notification was already sent for the product's current streak
    pub fn is_notified(&self, key: &str) -> bool {
        self.records.get(key).is_some_and(|record| record.notified)
    }

    /// Record that a notification was sent
    pub fn mark_notified(&mut self, key: impl Into<String>, timestamp: impl Into<String>) {
        self.records.insert(
            key.into(),
            NotificationRecord {
                notified: true,
                timestamp: timestamp.into(),
            },
        );
    }

    /// Clear the notified flag of an existing entry
    ///
    /// Returns `true` if the flag was set before. Absent entries stay absent.
    pub fn reset(&mut self, key: &str) -> bool {
        match self.records.get_mut(key) {
            Some(record) => std::mem::replace(&mut record.notified, false),
            None => false,
        }
    }

    /// Number of products with an entry
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no product has an entry
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &NotificationRecord)> {
        self.records.iter()
    }
}

/// Trait for state store implementations
///
/// The state is loaded once at the start of a run and saved at most once at
/// the end, so implementations need no locking beyond what `&self` sharing
/// requires.
///
/// # Contract
///
/// - `load` returns an empty state when nothing was saved yet. Corrupt data
///   is logged and also treated as empty. Only unexpected storage failures
///   surface as `Err`; the run controller then continues with empty state.
/// - `save` replaces the stored state as a whole. Failures surface as `Err`
///   and are logged by the run controller; they never abort a run.
/// - Stores hold no business logic: deciding what the flags mean is the run
///   controller's job.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted notification state
    async fn load(&self) -> Result<NotificationState, crate::Error>;

    /// Persist the notification state
    async fn save(&self, state: &NotificationState) -> Result<(), crate::Error>;
}
