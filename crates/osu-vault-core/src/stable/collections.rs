//! Parser and writer for osu!stable's collection.db binary format
//!
//! Layout:
//! - i32: format version
//! - i32: collection count
//! - For each collection:
//!   - String: name (presence-flagged)
//!   - i32: beatmap count
//!   - For each beatmap: String (MD5 hash, presence-flagged)

use crate::binary::{self, Cursor};
use crate::collection::Collection;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Version written into new collection files.
pub const COLLECTION_DB_VERSION: i32 = 20251102;

/// Read collections from a collection.db file.
pub fn read_collections(path: &Path) -> Result<Vec<Collection>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let buf = fs::read(path)?;
    parse_collections(&buf)
}

/// Parse the collection.db binary format.
pub fn parse_collections(buf: &[u8]) -> Result<Vec<Collection>> {
    let mut cursor = Cursor::new(buf);

    let _version = cursor.i32()?;
    let count = cursor.i32()?;

    if count < 0 {
        return Err(Error::StableParse(format!("invalid collection count {count}")));
    }

    let mut collections = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let name = cursor.string()?.unwrap_or_default();
        let beatmap_count = cursor.i32()?;

        if beatmap_count < 0 {
            return Err(Error::StableParse(format!(
                "invalid beatmap count {beatmap_count} in collection {name}"
            )));
        }

        let mut hashes = Vec::with_capacity(beatmap_count as usize);
        for _ in 0..beatmap_count {
            hashes.push(cursor.string()?.unwrap_or_default());
        }

        collections.push(Collection::with_hashes(name, hashes));
    }

    debug!(collections = collections.len(), "parsed collection file");

    Ok(collections)
}

/// Serialize collections into the collection.db format.
///
/// A hash that is empty at write time is a fatal error naming the offending
/// collection.
pub fn write_collections(collections: &[Collection]) -> Result<Vec<u8>> {
    let mut chunks = vec![
        binary::write_i32(COLLECTION_DB_VERSION),
        binary::write_i32(collections.len() as i32),
    ];

    for collection in collections {
        chunks.push(binary::write_string(Some(&collection.name)));
        chunks.push(binary::write_i32(collection.beatmaps.len() as i32));

        for hash in &collection.beatmaps {
            if hash.is_empty() {
                return Err(Error::InvalidCollectionHash {
                    collection: collection.name.clone(),
                });
            }
            chunks.push(binary::write_string(Some(hash)));
        }
    }

    Ok(binary::join(chunks))
}

/// Sibling path for a timestamped backup of the current collection file.
pub fn backup_path(path: &Path) -> PathBuf {
    let timestamp = chrono::Utc::now().timestamp_millis();
    match path.parent() {
        Some(parent) => parent.join(format!("collection_{timestamp}.db")),
        None => PathBuf::from(format!("collection_{timestamp}.db")),
    }
}

/// Persist collections to disk.
///
/// The existing file is renamed to a timestamped backup before the new file
/// is written. This is not atomic: a crash between the rename and the write
/// leaves no current file on disk.
pub fn persist_collections(path: &Path, collections: &[Collection]) -> Result<()> {
    let buf = write_collections(collections)?;

    if path.exists() {
        let backup = backup_path(path);
        fs::rename(path, &backup)?;
        info!(backup = %backup.display(), "backed up previous collection file");
    }

    fs::write(path, buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_file() {
        let buf = binary::join(vec![binary::write_i32(20250101), binary::write_i32(0)]);
        let collections = parse_collections(&buf).unwrap();
        assert!(collections.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_names_and_hashes() {
        let collections = vec![
            Collection::with_hashes(
                "favorites",
                vec![
                    "d41d8cd98f00b204e9800998ecf8427e".to_string(),
                    "098f6bcd4621d373cade4e832627b4f6".to_string(),
                ],
            ),
            Collection::new("empty"),
        ];

        let buf = write_collections(&collections).unwrap();
        let parsed = parse_collections(&buf).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "favorites");
        assert_eq!(parsed[0].beatmaps, collections[0].beatmaps);
        assert_eq!(parsed[1].name, "empty");
        assert!(parsed[1].beatmaps.is_empty());
    }

    #[test]
    fn test_duplicate_hashes_survive_round_trip() {
        let hash = "d41d8cd98f00b204e9800998ecf8427e".to_string();
        let collections = vec![Collection::with_hashes("dupes", vec![hash.clone(), hash])];

        let buf = write_collections(&collections).unwrap();
        let parsed = parse_collections(&buf).unwrap();
        assert_eq!(parsed[0].beatmaps.len(), 2);
    }

    #[test]
    fn test_empty_hash_is_fatal() {
        let collections = vec![Collection::with_hashes("broken", vec![String::new()])];
        let err = write_collections(&collections).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_missing_file() {
        let err = read_collections(Path::new("/definitely/not/here/collection.db")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_persist_creates_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.db");

        let first = vec![Collection::new("one")];
        persist_collections(&path, &first).unwrap();
        assert!(path.exists());

        let second = vec![Collection::new("one"), Collection::new("two")];
        persist_collections(&path, &second).unwrap();

        let parsed = parse_collections(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 2);

        // the old file must have been renamed to a timestamped sibling
        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.starts_with("collection_") && name.ends_with(".db")
            })
            .collect();
        assert_eq!(backups.len(), 1);
    }
}
