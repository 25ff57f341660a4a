//! JSON usage store
//!
//! Holds both usage mappings in one human-readable document that is fully
//! rewritten on every save.

use crate::types::{Result, ScreentrackError, UsageData};
use directories::BaseDirs;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const STORE_FILE: &str = "usage.json";

/// Default data directory (`~/.screentrack`)
pub fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new()
        .ok_or_else(|| ScreentrackError::Store("Cannot determine home directory".into()))?;
    Ok(base_dirs.home_dir().join(".screentrack"))
}

pub struct UsageStore {
    path: PathBuf,
}

impl UsageStore {
    /// Store at the default location
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: data_dir()?.join(STORE_FILE),
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file carrying the read/write lock. The store itself is only
    /// ever created by the final rename, never left empty.
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    fn open_lock(&self) -> std::io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())
    }

    /// Read the stored document.
    ///
    /// Returns `Ok(None)` when no store exists yet. Content that is not a JSON
    /// object holding the usage mappings is reported as
    /// [`ScreentrackError::CorruptStore`].
    /// Uses a shared lock on the sidecar for concurrent read safety.
    pub fn load(&self) -> Result<Option<UsageData>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Read-only locations can still be read, just without the lock
        let lock = match self.open_lock() {
            Ok(lock) => {
                lock.lock_shared().map_err(|e| {
                    ScreentrackError::Store(format!("Failed to acquire read lock: {}", e))
                })?;
                Some(lock)
            }
            Err(e) => {
                log::debug!("reading {} unlocked: {}", self.path.display(), e);
                None
            }
        };

        let mut content = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut content);
        if let Some(lock) = &lock {
            let _ = lock.unlock();
        }
        read?;

        let corrupt = |reason: String| ScreentrackError::CorruptStore {
            path: self.path.clone(),
            reason,
        };

        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
        if !value.is_object() {
            return Err(corrupt("top level is not a JSON object".into()));
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| corrupt(e.to_string()))
    }

    /// Save using atomic write (temp file + rename) with exclusive lock.
    pub fn save(&self, data: &UsageData) -> Result<()> {
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| ScreentrackError::Store(format!("Serialization failed: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");

        {
            let mut file = File::create(&temp_path)
                .map_err(|e| ScreentrackError::Store(format!("Failed to create temp file: {}", e)))?;
            file.write_all(content.as_bytes())
                .map_err(|e| ScreentrackError::Store(format!("Failed to write temp file: {}", e)))?;
            file.sync_all()
                .map_err(|e| ScreentrackError::Store(format!("Failed to sync temp file: {}", e)))?;
        }

        let lock = self
            .open_lock()
            .map_err(|e| ScreentrackError::Store(format!("Failed to open lock file: {}", e)))?;

        lock.lock_exclusive()
            .map_err(|e| ScreentrackError::Store(format!("Failed to acquire write lock: {}", e)))?;

        let renamed = fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            ScreentrackError::Store(format!("Failed to rename temp file: {}", e))
        });

        let _ = lock.unlock();
        renamed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppTotals;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn create_test_store() -> (UsageStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = UsageStore::with_path(temp_dir.path().join("usage.json"));
        (store, temp_dir)
    }

    fn sample_data() -> UsageData {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let mut data = UsageData::default();
        data.app_usage.add("code", 42.5);
        data.app_usage.add("firefox", 10.0);
        let mut day = AppTotals::new();
        day.add("code", 42.5);
        day.add("firefox", 10.0);
        data.daily_usage.insert(date, day);
        data
    }

    #[test]
    fn test_load_missing_store_is_none() {
        let (store, _dir) = create_test_store();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let (store, _dir) = create_test_store();
        let data = sample_data();

        store.save(&data).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded, data);
    }

    #[test]
    fn test_saved_document_layout() {
        let (store, _dir) = create_test_store();
        store.save(&sample_data()).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("{\n  \"app_usage\": {\n    \"code\": 42.5,"));
        assert!(content.contains("\"daily_usage\": {\n    \"2024-03-09\": {"));
    }

    #[test]
    fn test_save_overwrites_previous_content() {
        let (store, _dir) = create_test_store();
        store.save(&sample_data()).unwrap();
        store.save(&UsageData::default()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.is_empty());
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let store = UsageStore::with_path(temp_dir.path().join("nested").join("usage.json"));
        store.save(&sample_data()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_load_corrupt_store() {
        let (store, _dir) = create_test_store();
        fs::write(store.path(), "{ not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, ScreentrackError::CorruptStore { .. }));
    }

    #[test]
    fn test_load_wrong_shape_is_corrupt() {
        let (store, _dir) = create_test_store();
        fs::write(store.path(), r#"{"app_usage": ["code"]}"#).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, ScreentrackError::CorruptStore { .. }));
    }

    #[test]
    fn test_load_top_level_array_is_corrupt() {
        let (store, _dir) = create_test_store();
        fs::write(store.path(), "[]").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, ScreentrackError::CorruptStore { .. }));
    }

    #[test]
    fn test_save_locks_sidecar_not_store() {
        let (store, _dir) = create_test_store();
        store.save(&sample_data()).unwrap();

        assert!(store.lock_path().exists());
        assert_eq!(store.load().unwrap().unwrap(), sample_data());
    }

    #[test]
    fn test_failed_first_save_leaves_no_empty_store() {
        let (store, _dir) = create_test_store();
        // temp path occupied by a directory makes the write fail
        fs::create_dir(store.path().with_extension("json.tmp")).unwrap();

        assert!(store.save(&sample_data()).is_err());
        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "file, not dir").unwrap();
        let store = UsageStore::with_path(blocker.join("usage.json"));

        assert!(store.save(&sample_data()).is_err());
    }
}
