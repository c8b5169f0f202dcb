// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Keeps state for the lifetime of the process only. Every new process
// starts empty, so a product that is in stock gets announced again on the
// next run.
//
// ## When to Use
//
// - Testing environments
// - One-off runs where repeated notifications are acceptable

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{NotificationState, StateStore};

/// In-memory state store implementation
///
/// Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<NotificationState>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with state
    pub fn with_state(state: NotificationState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Snapshot of the current state
    pub async fn snapshot(&self) -> NotificationState {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<NotificationState, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, state: &NotificationState) -> Result<(), Error> {
        *self.inner.write().await = state.clone();
        Ok(())
    }
}
