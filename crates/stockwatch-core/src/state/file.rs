// # File State Store
//
// File-based implementation of StateStore.
//
// ## Purpose
//
// Keeps the notification flags across scheduled runs so that a product
// that stays in stock is announced once per streak, not once per run.
//
// ## Failure Handling
//
// - Missing file: empty state
// - Corrupt JSON: warning, empty state (the next save overwrites it)
// - Atomic writes: new state written to a `.tmp` sibling, then renamed
//
// ## File Format
//
// ```json
// {
//   "94": {
//     "notified": true,
//     "timestamp": "2025-01-09 20:00:00"
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::{NotificationState, StateStore};

/// File-based state store
///
/// # Example
///
/// ```rust,no_run
/// use stockwatch_core::state::FileStateStore;
/// use stockwatch_core::traits::state_store::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/stockwatch/state.json");
///
///     let mut state = store.load().await?;
///     state.mark_notified("94", "2025-01-09 20:00:00");
///     store.save(&state).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by the given file
    ///
    /// Nothing is touched on disk until the first `load` or `save`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    async fn read_state(&self) -> Result<Option<Vec<u8>>, Error> {
        // Raw bytes: bad encoding is a parse failure, not a read failure
        match fs::read(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::state_store(format!(
                "Failed to read state file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write_state(&self, json: &str) -> Result<(), Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<NotificationState, Error> {
        let Some(content) = self.read_state().await? else {
            tracing::debug!("State file does not exist: {}", self.path.display());
            return Ok(NotificationState::new());
        };

        match serde_json::from_slice::<NotificationState>(&content) {
            Ok(state) => {
                tracing::debug!("Loaded state from file: {} records", state.len());
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(
                    "Could not parse state file {}: {}. Starting with empty state.",
                    self.path.display(),
                    e
                );
                Ok(NotificationState::new())
            }
        }
    }

    async fn save(&self, state: &NotificationState) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| Error::state_store(format!("Failed to serialize state: {}", e)))?;

        self.write_state(&json).await?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }
}
