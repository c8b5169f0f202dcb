//! Core traits for the stockwatch system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`StockProber`]: Observe whether a product can be ordered
//! - [`Notifier`]: Deliver messages through an external channel
//! - [`StateStore`]: Persist notification state between runs

pub mod stock_prober;
pub mod notifier;
pub mod state_store;

pub use stock_prober::{StockProber, StockStatus, Observation, classify_page};
pub use notifier::{Notifier, Message, MessageKind};
pub use state_store::{StateStore, NotificationState, NotificationRecord};
