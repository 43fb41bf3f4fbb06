//! Content-addressed file storage for the modern backend
//!
//! Files are stored at `files/{hash[0]}/{hash[0..2]}/{hash}` where `hash`
//! is the lowercase hex digest of the file content.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Handler for the modern backend's hash-prefixed file storage.
pub struct FileStore {
    files_path: PathBuf,
}

impl FileStore {
    /// Create a file store handler rooted at the backend's data directory.
    pub fn new(data_path: &Path) -> Self {
        Self {
            files_path: data_path.join("files"),
        }
    }

    /// Resolve a content hash to its on-disk location.
    ///
    /// Path format: `files/{hash[0]}/{hash[0..2]}/{hash}`
    pub fn hash_to_path(&self, hash: &str) -> PathBuf {
        let hash = hash.to_lowercase();
        if hash.len() < 2 {
            return self.files_path.join(&hash);
        }

        self.files_path
            .join(&hash[0..1])
            .join(&hash[0..2])
            .join(&hash)
    }

    /// Check if a file exists in the store.
    pub fn exists(&self, hash: &str) -> bool {
        self.hash_to_path(hash).exists()
    }

    /// Read a file by its content hash.
    pub fn read(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.hash_to_path(hash);
        if !path.exists() {
            return Err(Error::BeatmapNotFound(format!(
                "file with hash {hash} not found"
            )));
        }
        Ok(fs::read(path)?)
    }

    /// Write content into the store under its own hash, returning the hash.
    pub fn write(&self, content: &[u8]) -> Result<String> {
        let hash = Self::calculate_hash(content);
        let path = self.hash_to_path(&hash);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;

        Ok(hash)
    }

    /// Verify a file's hash matches its content.
    pub fn verify(&self, hash: &str) -> Result<bool> {
        let content = self.read(hash)?;
        Ok(Self::calculate_hash(&content) == hash.to_lowercase())
    }

    /// Enumerate every hash in the store, walking the two prefix levels in
    /// parallel.
    pub fn list_all(&self) -> Result<Vec<String>> {
        use rayon::prelude::*;

        if !self.files_path.exists() {
            return Ok(Vec::new());
        }

        let prefix_dirs: Vec<_> = fs::read_dir(&self.files_path)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .collect();

        let hashes: Vec<String> = prefix_dirs
            .par_iter()
            .flat_map(|first| {
                let mut local = Vec::new();
                if let Ok(second_iter) = fs::read_dir(first.path()) {
                    for second in second_iter.filter_map(|e| e.ok()) {
                        if !second.path().is_dir() {
                            continue;
                        }
                        if let Ok(file_iter) = fs::read_dir(second.path()) {
                            for file in file_iter.filter_map(|e| e.ok()) {
                                if file.path().is_file() {
                                    if let Some(name) = file.file_name().to_str() {
                                        local.push(name.to_string());
                                    }
                                }
                            }
                        }
                    }
                }
                local
            })
            .collect();

        Ok(hashes)
    }

    /// Calculate the SHA-256 hash of content.
    pub fn calculate_hash(content: &[u8]) -> String {
        format!("{:x}", Sha256::digest(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_to_path_layout() {
        let store = FileStore::new(Path::new("/data/osu"));

        let hash = "a1b2c3d4e5f6";
        let path = store.hash_to_path(hash);
        assert!(path.ends_with("a/a1/a1b2c3d4e5f6"));
    }

    #[test]
    fn test_hash_to_path_lowercases() {
        let store = FileStore::new(Path::new("/data/osu"));
        let path = store.hash_to_path("ABCDEF");
        assert!(path.ends_with("a/ab/abcdef"));
    }

    #[test]
    fn test_write_read_verify() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let hash = store.write(b"osu file format v14").unwrap();
        assert_eq!(hash.len(), 64);
        assert!(store.exists(&hash));
        assert_eq!(store.read(&hash).unwrap(), b"osu file format v14");
        assert!(store.verify(&hash).unwrap());
    }

    #[test]
    fn test_read_missing_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.read(&"0".repeat(64)).is_err());
    }

    #[test]
    fn test_list_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.list_all().unwrap().is_empty());

        let first = store.write(b"one").unwrap();
        let second = store.write(b"two").unwrap();

        let mut all = store.list_all().unwrap();
        all.sort();
        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(all, expected);
    }
}
