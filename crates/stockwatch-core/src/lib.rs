// # stockwatch-core
//
// Core library for the stockwatch restock notifier.
//
// ## Architecture Overview
//
// This library provides the core functionality for restock notifications:
// - **StockProber**: Trait for checking whether a product can be ordered
// - **Notifier**: Trait for delivering messages through a channel
// - **StateStore**: Trait for persisting notification flags between runs
// - **StockMonitor**: Run controller that orchestrates probe → latch → notify → save
// - **report**: Pure message rendering
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from adapters
// 2. **Pure Core**: The notification latch is a function of (state, observations)
// 3. **Never Fatal**: Every failure degrades to a log line, the next run retries
// 4. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod report;
pub mod state;

// Re-export core types for convenience
pub use traits::{Notifier, StateStore, StockProber};
pub use traits::{Message, MessageKind, NotificationState, Observation, StockStatus};
pub use engine::{MonitorEvent, RunMode, RunSummary, StockMonitor};
pub use config::{BarkConfig, MonitorConfig, Product, StateStoreConfig, TelegramConfig};
pub use error::{Error, Result};
pub use state::{FileStateStore, MemoryStateStore};
