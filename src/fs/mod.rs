// src/fs/mod.rs

//! File-system seam.
//!
//! Validation and fingerprinting only ever touch the disk through
//! [`FileSystem`], so tests can swap in [`mock::MockFileSystem`].

use std::fmt::Debug;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn remove(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path).with_context(|| format!("opening file {:?}", path))?;
        Ok(Box::new(file))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating dir {:?}", parent))?;
            }
        }
        let mut file =
            fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents)
            .with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("removing file {:?}", path))
    }

    /// Only "not found" counts as absent. Other metadata errors (permissions,
    /// symlink loops) report the path as present, so reading it surfaces the
    /// real error.
    fn exists(&self, path: &Path) -> bool {
        match fs::metadata(path) {
            Ok(_) => true,
            Err(err) => err.kind() != ErrorKind::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_path_is_absent() {
        let dir = tempdir().unwrap();
        let fs = RealFileSystem;
        assert!(!fs.exists(&dir.path().join("nope")));

        let file = dir.path().join("yes");
        fs.write(&file, b"1").unwrap();
        assert!(fs.exists(&file));
        fs.remove(&file).unwrap();
        assert!(!fs.exists(&file));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_is_present_but_unreadable() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::os::unix::fs::symlink(&b, &a).unwrap();
        std::os::unix::fs::symlink(&a, &b).unwrap();

        let fs = RealFileSystem;
        assert!(fs.exists(&a));
        assert!(fs.open_read(&a).is_err());
    }
}
