//! Durable Match Slot
//!
//! One key holding the serialized `Option<Match>`. Read once at startup,
//! then written by the match actor after every change.

pub mod migrate;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

use crate::game::state::Match;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record is not valid JSON or does not fit the match shape.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Record was written by a newer build.
    #[error("unsupported record version {0}")]
    UnsupportedVersion(u64),

    /// Record cannot be brought up to the current shape.
    #[error("migration failed: {0}")]
    Migration(String),
}

/// Load/store/clear over a single durable slot.
pub trait MatchStore: Send + 'static {
    /// Read the slot. `Ok(None)` when empty.
    fn load(&self) -> Result<Option<Match>, StoreError>;

    /// Overwrite the slot.
    fn store(&self, m: &Match) -> Result<(), StoreError>;

    /// Empty the slot.
    fn clear(&self) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY
// =============================================================================

/// In-process slot. Goes through the same envelope as the file store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Value>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a raw record.
    pub fn with_raw(raw: Value) -> Self {
        Self { slot: Mutex::new(Some(raw)) }
    }

    /// Raw record currently held.
    pub fn raw(&self) -> Option<Value> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn with_slot<T>(&self, f: impl FnOnce(&mut Option<Value>) -> T) -> T {
        match self.slot.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl MatchStore for MemoryStore {
    fn load(&self) -> Result<Option<Match>, StoreError> {
        self.with_slot(|slot| slot.clone())
            .map(|raw| migrate::decode(raw, Utc::now()))
            .transpose()
    }

    fn store(&self, m: &Match) -> Result<(), StoreError> {
        let raw = migrate::encode(m)?;
        self.with_slot(|slot| *slot = Some(raw));
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.with_slot(|slot| *slot = None);
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// JSON file slot. Writes go to a sibling temp file and are renamed in place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl MatchStore for JsonFileStore {
    fn load(&self) -> Result<Option<Match>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let raw: Value = serde_json::from_str(&text)?;
        if raw.is_null() {
            return Ok(None);
        }
        migrate::decode(raw, Utc::now()).map(Some)
    }

    fn store(&self, m: &Match) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&migrate::encode(m)?)?;
        let tmp = self.temp_path();
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::locator::Locator;
    use crate::game::state::{PlayerSlot, Visibility};

    fn sample() -> Match {
        Match::new("secret1abc", Locator::new([8; 32]), Visibility::Public, PlayerSlot::Unknown, Utc::now())
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        let m = sample();
        store.store(&m).unwrap();
        assert_eq!(store.load().unwrap(), Some(m));
        assert_eq!(store.raw().and_then(|r| r["version"].as_u64()), Some(migrate::CURRENT_VERSION));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store() {
        let dir = std::env::temp_dir().join(format!("handsign-store-{}", Locator::generate().short()));
        let store = JsonFileStore::new(dir.join("match.json"));
        assert!(store.load().unwrap().is_none());

        let m = sample();
        store.store(&m).unwrap();
        assert_eq!(store.load().unwrap(), Some(m));
        assert!(store.path().exists());
        assert!(!store.temp_path().exists());

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_file_store_corrupt_record() {
        let dir = std::env::temp_dir().join(format!("handsign-store-{}", Locator::generate().short()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("match.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Serde(_))));

        let _ = fs::remove_dir_all(dir);
    }
}
