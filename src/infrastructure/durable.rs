//! File-backed durable cache tier.
//!
//! One JSON file per key, named by the SHA-256 of the key, holding
//! `{"value": ..., "expires_at": ...}`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::infrastructure::traits::{DurableEntry, DurableStore, FileSystem};

const ENTRY_EXTENSION: &str = "json";

pub struct FileDurableStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl FileDurableStore {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let name = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{name}.{ENTRY_EXTENSION}"))
    }
}

fn invalid_data(e: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

impl DurableStore for FileDurableStore {
    fn ping(&self) -> io::Result<()> {
        self.fs.create_dir_all(&self.dir)?;
        if self.fs.is_dir(&self.dir) {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a directory: {}", self.dir.display()),
            ))
        }
    }

    fn load(&self, key: &str) -> io::Result<Option<DurableEntry>> {
        let path = self.entry_path(key);
        if !self.fs.exists(&path) {
            return Ok(None);
        }
        let content = self.fs.read_to_string(&path)?;
        serde_json::from_str(&content).map(Some).map_err(invalid_data)
    }

    fn store(&self, key: &str, entry: &DurableEntry) -> io::Result<()> {
        let path = self.entry_path(key);
        let content = serde_json::to_string(entry).map_err(invalid_data)?;
        self.fs.ensure_parent(&path)?;
        self.fs.write(&path, &content)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let path = self.entry_path(key);
        if self.fs.exists(&path) {
            self.fs.remove_file(&path)?;
        }
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        if !self.fs.exists(&self.dir) {
            return Ok(());
        }
        let mut removed = 0usize;
        for path in self.fs.read_dir(&self.dir)? {
            if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
                self.fs.remove_file(&path)?;
                removed += 1;
            }
        }
        debug!("removed {removed} durable entries from {}", self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn given_stored_entry_when_loading_then_round_trips_envelope() {
        let temp = TempDir::new().unwrap();
        let store = FileDurableStore::new(Arc::new(RealFileSystem), temp.path().join("cache"));
        store.ping().unwrap();
        let entry = DurableEntry {
            value: json!({"procedureList": []}),
            expires_at: Utc::now() + Duration::seconds(60),
        };

        store.store("tree:q", &entry).unwrap();

        assert_eq!(store.load("tree:q").unwrap(), Some(entry));
        assert_eq!(store.load("tree:other").unwrap(), None);
        let raw = std::fs::read_to_string(store.entry_path("tree:q")).unwrap();
        assert!(raw.contains("\"expires_at\""));
    }

    #[test]
    fn given_entries_when_clearing_then_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = FileDurableStore::new(Arc::new(RealFileSystem), temp.path());
        let entry = DurableEntry {
            value: json!(1),
            expires_at: Utc::now(),
        };
        store.store("a", &entry).unwrap();
        store.store("b", &entry).unwrap();

        store.clear().unwrap();

        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
