use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::errors::{FlashcardError, Result};
use crate::log_storage_operation;

/// Durable key/value slot backing the deck store
pub trait KeyValueStorage: Send {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    slots: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &[u8]) -> Self {
        let mut storage = Self::new();
        storage.slots.insert(key.to_string(), value.to_vec());
        storage
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.slots.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// One JSON file per key inside a directory. Writes go through a temp file
/// and a rename so a crash never leaves a half-written slot.
#[derive(Debug, Clone)]
pub struct FileStorage {
    directory: PathBuf,
}

impl FileStorage {
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|e| {
            FlashcardError::Storage(format!("cannot create {}: {}", directory.display(), e))
        })?;
        log_storage_operation!(info, "open", format!("using {}", directory.display()));
        Ok(Self { directory })
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            && !key.starts_with('.');
        if !valid {
            return Err(FlashcardError::Storage(format!("invalid storage key '{}'", key)));
        }
        Ok(self.directory.join(format!("{}.json", key)))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let started = Instant::now();
        let path = self.slot_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => {
                log_storage_operation!(
                    debug,
                    "read_slot",
                    bytes = bytes.len(),
                    duration_ms = started.elapsed().as_millis() as u64
                );
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                log_storage_operation!(error, "read_slot", error = e);
                Err(e.into())
            }
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let started = Instant::now();
        let path = self.slot_path(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| {
                log_storage_operation!(error, "write_slot", error = e);
                FlashcardError::from(e)
            })?;
        log_storage_operation!(
            debug,
            "write_slot",
            bytes = value.len(),
            duration_ms = started.elapsed().as_millis() as u64
        );
        Ok(())
    }
}
