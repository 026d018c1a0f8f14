//! Serialize-on-mutate persistence of [`ChatState`].

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::errors::PersistError;
use crate::state::ChatState;

/// Where the store writes its state after every mutation.
///
/// `save` runs synchronously while the store holds its write lock, once per
/// mutation and so once per streamed chunk. Implementations should keep it
/// cheap.
pub trait StatePersister: Send + Sync {
    /// Read the saved state, if any.
    fn load(&self) -> Result<Option<ChatState>, PersistError>;

    /// Replace the saved state.
    fn save(&self, state: &ChatState) -> Result<(), PersistError>;
}

/// Compact JSON file. Writes go to a sibling temp file first and are
/// renamed into place.
#[derive(Clone, Debug)]
pub struct JsonFilePersister {
    path: PathBuf,
}

impl JsonFilePersister {
    /// Persister writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatePersister for JsonFilePersister {
    fn load(&self) -> Result<Option<ChatState>, PersistError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut state: ChatState = serde_json::from_str(&data)?;
        state.normalize();
        Ok(Some(state))
    }

    fn save(&self, state: &ChatState) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec(state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Keeps the last saved state in memory.
#[derive(Debug, Default)]
pub struct MemoryPersister {
    saved: Mutex<Option<ChatState>>,
    saves: Mutex<usize>,
}

impl MemoryPersister {
    /// Number of saves so far.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl StatePersister for MemoryPersister {
    fn load(&self) -> Result<Option<ChatState>, PersistError> {
        Ok(self.saved.lock().clone())
    }

    fn save(&self, state: &ChatState) -> Result<(), PersistError> {
        *self.saved.lock() = Some(state.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}
