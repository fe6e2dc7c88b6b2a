// src/cache/hash.rs

//! Content digests for fingerprinting.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::trace;

use crate::fs::FileSystem;

/// Compute the blake3 hash of a single file as lowercase hex.
///
/// Reads through `fs` in fixed-size chunks so large inputs are never held in
/// memory at once.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading file for hashing: {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let hash = hasher.finalize().to_hex().to_string();
    trace!(path = ?path, hash = %hash, "hashed file");
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn known_blake3_vector() {
        let fs = MockFileSystem::new();
        fs.add_file("test.txt", b"hello world".to_vec());

        let hash = compute_file_hash(&fs, Path::new("test.txt")).unwrap();
        assert_eq!(
            hash,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn empty_file_has_a_real_digest() {
        let fs = MockFileSystem::new();
        fs.add_file("empty", Vec::new());

        let hash = compute_file_hash(&fs, Path::new("empty")).unwrap();
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn missing_file_is_an_error_here() {
        let fs = MockFileSystem::new();
        assert!(compute_file_hash(&fs, Path::new("nope")).is_err());
    }
}
