// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    /// Exists, but every read fails. Models a permission or transient I/O
    /// error on an existing file.
    Unreadable,
}

/// In-memory file system. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.lock()
            .insert(path.as_ref().to_path_buf(), MockEntry::File(content.into()));
    }

    pub fn add_unreadable(&self, path: impl AsRef<Path>) {
        self.lock()
            .insert(path.as_ref().to_path_buf(), MockEntry::Unreadable);
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.lock().remove(path.as_ref());
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        // A panicking test thread must not hide the map from the others.
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        match self.lock().get(path) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(MockEntry::Unreadable) => Err(anyhow!("Permission denied: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match self.lock().remove(path) {
            Some(_) => Ok(()),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }
}
