//! Where the persisted session blob lives between runs

use portal_core::{CoreError, CoreResult, StateDir};
use std::{
    fmt::Debug,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

/// Key/value slot for the encoded session snapshot
pub trait SessionStorage: Send + Sync + Debug {
    /// The stored blob, or `None` if nothing was saved yet
    fn load(&self) -> CoreResult<Option<String>>;

    /// Replace the stored blob
    fn save(&self, blob: &str) -> CoreResult<()>;
}

/// One JSON file per storage key
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/<key>.json`
    pub fn for_key(state_dir: &StateDir, key: &str) -> Self {
        Self::new(state_dir.session_path(key))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> CoreResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::storage_error(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, blob: &str) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Readers only ever see a complete blob
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(blob.into())),
        }
    }

    /// Current contents
    pub fn contents(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> CoreResult<Option<String>> {
        Ok(self.contents())
    }

    fn save(&self, blob: &str) -> CoreResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(blob.to_string());
        Ok(())
    }
}
