//! Embedded object store for the modern backend
//!
//! Records are normalized: a beatmap carries a foreign-key id to its owning
//! set, sets own their metadata sub-record and file usages, and ownership is
//! resolved by id lookup rather than embedded back-references. Values are
//! bincode-encoded; every mutation happens inside a single-writer
//! transaction. Concurrent transactions against one store are not
//! supported; callers serialize access.

use crate::collection::Collection;
use crate::error::{Error, Result};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

const BEATMAPS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("beatmaps");
const BEATMAPSETS_TABLE: TableDefinition<i32, &[u8]> = TableDefinition::new("beatmapsets");
const COLLECTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("collections");
const META_TABLE: TableDefinition<&str, &str> = TableDefinition::new("meta");

const PLAYER_NAME_KEY: &str = "player_name";

/// A beatmap record in the modern store. `set_id` is a foreign key into the
/// beatmapset table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModernBeatmap {
    pub md5: String,
    pub online_id: i32,
    pub set_id: i32,
    pub difficulty: String,
    pub ruleset: u8,
    /// Modern status code, see [`crate::beatmap::Status::from_modern_code`].
    pub status: i32,
    pub star_rating: f64,
    pub bpm: f64,
    /// Total length in milliseconds.
    pub length: i32,
    pub ar: f32,
    pub cs: f32,
    pub hp: f32,
    pub od: f32,
    pub source: String,
    pub tags: String,
    /// Content hash of this difficulty's `.osu` file in the file store.
    pub file_hash: String,
    pub last_modified: i64,
}

/// Metadata owned by a beatmapset record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModernMetadata {
    pub artist: String,
    pub title: String,
    pub creator: String,
}

/// A named file belonging to a set, keyed by content hash into the file store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileUsage {
    pub filename: String,
    pub hash: String,
}

/// A beatmapset record in the modern store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModernBeatmapSet {
    pub online_id: i32,
    pub metadata: ModernMetadata,
    /// MD5 hashes of the member difficulties.
    pub beatmaps: Vec<String>,
    pub files: Vec<FileUsage>,
}

/// A collection record in the modern store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModernCollection {
    pub name: String,
    pub beatmaps: Vec<String>,
    pub last_modified: i64,
}

/// Handle to the modern backend's embedded store.
pub struct ModernStore {
    db: Database,
}

impl ModernStore {
    /// Open (or create) a store file, making sure all tables exist.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(Error::store)?;

        let txn = db.begin_write().map_err(Error::store)?;
        {
            txn.open_table(BEATMAPS_TABLE).map_err(Error::store)?;
            txn.open_table(BEATMAPSETS_TABLE).map_err(Error::store)?;
            txn.open_table(COLLECTIONS_TABLE).map_err(Error::store)?;
            txn.open_table(META_TABLE).map_err(Error::store)?;
        }
        txn.commit().map_err(Error::store)?;

        Ok(Self { db })
    }

    pub fn player_name(&self) -> Result<Option<String>> {
        let txn = self.db.begin_read().map_err(Error::store)?;
        let table = txn.open_table(META_TABLE).map_err(Error::store)?;
        let value = table
            .get(PLAYER_NAME_KEY)
            .map_err(Error::store)?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }

    pub fn set_player_name(&self, name: &str) -> Result<()> {
        let txn = self.db.begin_write().map_err(Error::store)?;
        {
            let mut table = txn.open_table(META_TABLE).map_err(Error::store)?;
            table.insert(PLAYER_NAME_KEY, name).map_err(Error::store)?;
        }
        txn.commit().map_err(Error::store)
    }

    /// Load every beatmap record.
    pub fn beatmaps(&self) -> Result<Vec<ModernBeatmap>> {
        let txn = self.db.begin_read().map_err(Error::store)?;
        let table = txn.open_table(BEATMAPS_TABLE).map_err(Error::store)?;

        let mut records = Vec::new();
        for entry in table.iter().map_err(Error::store)? {
            let (_, value) = entry.map_err(Error::store)?;
            records.push(bincode::deserialize(value.value()).map_err(Error::store)?);
        }
        Ok(records)
    }

    /// Load every beatmapset record.
    pub fn beatmapsets(&self) -> Result<Vec<ModernBeatmapSet>> {
        let txn = self.db.begin_read().map_err(Error::store)?;
        let table = txn.open_table(BEATMAPSETS_TABLE).map_err(Error::store)?;

        let mut records = Vec::new();
        for entry in table.iter().map_err(Error::store)? {
            let (_, value) = entry.map_err(Error::store)?;
            records.push(bincode::deserialize(value.value()).map_err(Error::store)?);
        }
        Ok(records)
    }

    /// Load every collection record.
    pub fn collections(&self) -> Result<Vec<ModernCollection>> {
        let txn = self.db.begin_read().map_err(Error::store)?;
        let table = txn.open_table(COLLECTIONS_TABLE).map_err(Error::store)?;

        let mut records = Vec::new();
        for entry in table.iter().map_err(Error::store)? {
            let (_, value) = entry.map_err(Error::store)?;
            records.push(bincode::deserialize(value.value()).map_err(Error::store)?);
        }
        Ok(records)
    }

    /// Upsert a beatmap record.
    pub fn insert_beatmap(&self, beatmap: &ModernBeatmap) -> Result<()> {
        let encoded = bincode::serialize(beatmap).map_err(Error::store)?;

        let txn = self.db.begin_write().map_err(Error::store)?;
        {
            let mut table = txn.open_table(BEATMAPS_TABLE).map_err(Error::store)?;
            table
                .insert(beatmap.md5.as_str(), encoded.as_slice())
                .map_err(Error::store)?;
        }
        txn.commit().map_err(Error::store)
    }

    /// Upsert a beatmapset record.
    pub fn insert_beatmapset(&self, set: &ModernBeatmapSet) -> Result<()> {
        let encoded = bincode::serialize(set).map_err(Error::store)?;

        let txn = self.db.begin_write().map_err(Error::store)?;
        {
            let mut table = txn.open_table(BEATMAPSETS_TABLE).map_err(Error::store)?;
            table
                .insert(set.online_id, encoded.as_slice())
                .map_err(Error::store)?;
        }
        txn.commit().map_err(Error::store)
    }

    /// Replace the stored collections with `desired` in one transaction:
    /// records whose name is absent from `desired` are deleted, the rest are
    /// upserted with a fresh last-modified stamp.
    pub fn write_collections(&self, desired: &[Collection]) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();

        let txn = self.db.begin_write().map_err(Error::store)?;
        {
            let mut table = txn.open_table(COLLECTIONS_TABLE).map_err(Error::store)?;

            let existing: Vec<String> = table
                .iter()
                .map_err(Error::store)?
                .map(|entry| entry.map(|(key, _)| key.value().to_string()))
                .collect::<std::result::Result<_, _>>()
                .map_err(Error::store)?;

            for name in existing {
                if !desired.iter().any(|c| c.name == name) {
                    table.remove(name.as_str()).map_err(Error::store)?;
                }
            }

            for collection in desired {
                let record = ModernCollection {
                    name: collection.name.clone(),
                    beatmaps: collection.beatmaps.clone(),
                    last_modified: now,
                };
                let encoded = bincode::serialize(&record).map_err(Error::store)?;
                table
                    .insert(collection.name.as_str(), encoded.as_slice())
                    .map_err(Error::store)?;
            }
        }
        txn.commit().map_err(Error::store)?;

        debug!(collections = desired.len(), "persisted collections to modern store");
        Ok(())
    }

    /// Delete beatmap records and strip their hashes from the owning sets,
    /// all in one transaction. Sets left without members are removed.
    /// Returns the number of beatmap records actually deleted.
    pub fn delete_beatmaps(&self, hashes: &HashSet<String>) -> Result<usize> {
        let mut deleted = 0;

        let txn = self.db.begin_write().map_err(Error::store)?;
        {
            let mut beatmaps = txn.open_table(BEATMAPS_TABLE).map_err(Error::store)?;
            for hash in hashes {
                if beatmaps.remove(hash.as_str()).map_err(Error::store)?.is_some() {
                    deleted += 1;
                }
            }

            let mut sets = txn.open_table(BEATMAPSETS_TABLE).map_err(Error::store)?;
            let records: Vec<ModernBeatmapSet> = {
                let mut out = Vec::new();
                for entry in sets.iter().map_err(Error::store)? {
                    let (_, value) = entry.map_err(Error::store)?;
                    out.push(bincode::deserialize(value.value()).map_err(Error::store)?);
                }
                out
            };

            for mut set in records {
                if !set.beatmaps.iter().any(|md5| hashes.contains(md5)) {
                    continue;
                }

                set.beatmaps.retain(|md5| !hashes.contains(md5));

                if set.beatmaps.is_empty() {
                    sets.remove(set.online_id).map_err(Error::store)?;
                } else {
                    let encoded = bincode::serialize(&set).map_err(Error::store)?;
                    sets.insert(set.online_id, encoded.as_slice())
                        .map_err(Error::store)?;
                }
            }
        }
        txn.commit().map_err(Error::store)?;

        Ok(deleted)
    }
}
