//! Backend-agnostic driver abstraction
//!
//! Both storage generations are exposed through the [`Driver`] trait. Each
//! implementation owns a [`DriverState`]: the three canonical maps built
//! once by the initial scan, a temporary overlay for records known to the
//! session but not yet persisted, and a pending-deletion marker set so
//! repeated reads stay consistent with deletions that have not been flushed
//! to the backing store yet.
//!
//! Everything that does not touch the backing store directly is a provided
//! trait method over the shared state, so both backends behave identically.

mod modern;
mod stable;

pub use modern::ModernDriver;
pub use stable::StableDriver;

use crate::beatmap::{Beatmap, BeatmapSet, BeatmapSetMetadata};
use crate::collection::Collection;
use crate::config::{BackendKind, Config};
use crate::error::Result;
use crate::exporter::{self, ExportFormat};
use crate::filter::{filter_beatmap, sort_beatmaps, sort_beatmapsets, BeatmapFilter, BeatmapSetFilter};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use tracing::debug;

/// A file backing a beatmap or set, resolved for packaging/export.
#[derive(Debug, Clone)]
pub struct BeatmapFile {
    /// Name inside the exported archive.
    pub name: String,
    /// Location on disk.
    pub location: PathBuf,
}

/// Result of a beatmap search: matching hashes in rank order, plus the
/// hashes that could not be resolved or did not pass the filters.
#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub beatmaps: Vec<String>,
    pub invalid: Vec<String>,
}

/// Result of a beatmapset search.
#[derive(Debug, Clone, Default)]
pub struct SetSearchResponse {
    pub beatmapsets: Vec<BeatmapSet>,
    pub invalid: Vec<i32>,
}

/// Batched fetch result: resolved records plus the keys that resolved to
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub beatmaps: Vec<Beatmap>,
    pub invalid: Vec<String>,
}

/// Batched beatmapset fetch result.
#[derive(Debug, Clone, Default)]
pub struct SetFetchResult {
    pub beatmapsets: Vec<BeatmapSet>,
    pub invalid: Vec<i32>,
}

/// Canonical in-memory state shared by every driver implementation.
#[derive(Default)]
pub struct DriverState {
    pub beatmaps: BTreeMap<String, Beatmap>,
    pub beatmapsets: BTreeMap<i32, BeatmapSet>,
    pub collections: BTreeMap<String, Collection>,

    /// Overlay: records known to the session but not in the backing store.
    pub temp_beatmaps: BTreeMap<String, Beatmap>,
    pub temp_beatmapsets: BTreeMap<i32, BeatmapSet>,

    /// Beatmaps removed from view but not yet flushed from the store.
    pub pending_deletion: HashSet<String>,

    /// Set by any collection mutation, cleared by a successful persist.
    pub should_update: bool,
    pub initialized: bool,
}

impl DriverState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything built by a previous scan.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Look a record up across the canonical map and the overlay, honoring
    /// in-flight deletions.
    pub fn lookup(&self, md5: &str) -> Option<&Beatmap> {
        if self.pending_deletion.contains(md5) {
            return None;
        }
        self.beatmaps.get(md5).or_else(|| self.temp_beatmaps.get(md5))
    }

    /// Every known hash: overlay first, then the canonical map.
    pub fn all_checksums(&self) -> Vec<String> {
        let mut checksums: Vec<String> = self.temp_beatmaps.keys().cloned().collect();
        checksums.extend(
            self.beatmaps
                .keys()
                .filter(|md5| !self.pending_deletion.contains(*md5))
                .cloned(),
        );
        checksums
    }

    pub fn add_collection(&mut self, name: &str, beatmaps: Vec<String>) -> bool {
        if self.collections.contains_key(name) {
            return false;
        }

        self.collections
            .insert(name.to_string(), Collection::with_hashes(name, beatmaps));
        self.should_update = true;
        true
    }

    pub fn rename_collection(&mut self, old_name: &str, new_name: &str) -> bool {
        if self.collections.contains_key(new_name) {
            return false;
        }
        let Some(mut collection) = self.collections.remove(old_name) else {
            return false;
        };

        collection.name = new_name.to_string();
        self.collections.insert(new_name.to_string(), collection);
        self.should_update = true;
        true
    }

    pub fn delete_collection(&mut self, name: &str) -> bool {
        let removed = self.collections.remove(name).is_some();
        if removed {
            self.should_update = true;
        }
        removed
    }

    pub fn add_beatmaps_to_collection(&mut self, name: &str, hashes: &[String]) -> bool {
        let Some(collection) = self.collections.get_mut(name) else {
            return false;
        };

        collection.merge_hashes(hashes);
        self.should_update = true;
        true
    }

    /// Add a record to the temporary overlay. The owning set is cloned from
    /// the canonical map when it exists there, otherwise created from the
    /// record's own metadata. Records without a well-formed content hash
    /// are rejected.
    pub fn add_beatmap(&mut self, mut beatmap: Beatmap) -> bool {
        if !crate::beatmap::is_valid_hash(&beatmap.md5) {
            return false;
        }

        beatmap.temp = true;
        let set_id = beatmap.beatmapset_id;
        let md5 = beatmap.md5.clone();

        if !self.temp_beatmapsets.contains_key(&set_id) {
            let set = match self.beatmapsets.get(&set_id) {
                Some(real_set) => {
                    let mut set = real_set.clone();
                    set.temp = true;
                    set
                }
                None => BeatmapSet {
                    online_id: set_id,
                    metadata: BeatmapSetMetadata {
                        artist: beatmap.artist.clone(),
                        title: beatmap.title.clone(),
                        creator: beatmap.creator.clone(),
                    },
                    beatmaps: Vec::new(),
                    temp: true,
                },
            };
            self.temp_beatmapsets.insert(set_id, set);
        }

        if let Some(set) = self.temp_beatmapsets.get_mut(&set_id) {
            if !set.beatmaps.contains(&md5) {
                set.beatmaps.push(md5.clone());
            }
        }

        self.temp_beatmaps.insert(md5, beatmap);
        true
    }

    /// Remove a beatmap from one collection, or mark it for deletion from
    /// the backing store when no collection is given.
    pub fn delete_beatmap(&mut self, md5: &str, collection: Option<&str>) -> bool {
        if let Some(name) = collection {
            let Some(collection) = self.collections.get_mut(name) else {
                return false;
            };
            collection.beatmaps.retain(|hash| hash != md5);
            self.should_update = true;
            return true;
        }

        if self.temp_beatmaps.remove(md5).is_some() {
            return true;
        }

        if self.beatmaps.contains_key(md5) {
            self.pending_deletion.insert(md5.to_string());
            return true;
        }

        false
    }

    pub fn has_beatmap(&self, md5: &str) -> bool {
        !self.pending_deletion.contains(md5) && self.beatmaps.contains_key(md5)
    }

    pub fn has_beatmapset(&self, id: i32) -> bool {
        self.beatmapsets.contains_key(&id)
    }

    pub fn beatmap_by_id(&self, id: i32) -> Option<&Beatmap> {
        self.beatmaps
            .values()
            .find(|b| b.online_id == id && !self.pending_deletion.contains(&b.md5))
            .or_else(|| self.temp_beatmaps.values().find(|b| b.online_id == id))
    }

    pub fn beatmapset(&self, id: i32) -> Option<&BeatmapSet> {
        self.temp_beatmapsets
            .get(&id)
            .or_else(|| self.beatmapsets.get(&id))
    }

    /// Full listing: overlay first, then canonical records.
    pub fn list_beatmaps(&self) -> Vec<Beatmap> {
        let mut all: Vec<Beatmap> = self.temp_beatmaps.values().cloned().collect();
        all.extend(
            self.beatmaps
                .values()
                .filter(|b| !self.pending_deletion.contains(&b.md5))
                .cloned(),
        );
        all
    }

    pub fn list_beatmapsets(&self) -> Vec<BeatmapSet> {
        let mut all: Vec<BeatmapSet> = self.temp_beatmapsets.values().cloned().collect();
        all.extend(
            self.beatmapsets
                .values()
                .filter(|set| !self.temp_beatmapsets.contains_key(&set.online_id))
                .cloned(),
        );
        all
    }

    pub fn fetch_beatmaps(&self, checksums: &[String]) -> FetchResult {
        let mut result = FetchResult::default();

        for md5 in checksums {
            match self.lookup(md5) {
                Some(beatmap) => result.beatmaps.push(beatmap.clone()),
                None => result.invalid.push(md5.clone()),
            }
        }

        result
    }

    pub fn fetch_beatmapsets(&self, ids: &[i32]) -> SetFetchResult {
        let mut result = SetFetchResult::default();

        for id in ids {
            match self.beatmapset(*id) {
                Some(set) => result.beatmapsets.push(set.clone()),
                None => result.invalid.push(*id),
            }
        }

        result
    }

    /// Hashes referenced by one collection (or all of them) that resolve to
    /// nothing, or only to an overlay record not yet in the backing store.
    pub fn missing_beatmaps(&self, collection: Option<&str>) -> Vec<String> {
        let hashes: Vec<String> = match collection {
            Some(name) => self
                .collections
                .get(name)
                .map(|c| c.beatmaps.clone())
                .unwrap_or_default(),
            None => {
                let mut unique = Vec::new();
                let mut seen = HashSet::new();
                for collection in self.collections.values() {
                    for hash in &collection.beatmaps {
                        if !hash.is_empty() && seen.insert(hash.clone()) {
                            unique.push(hash.clone());
                        }
                    }
                }
                unique
            }
        };

        let missing: Vec<String> = hashes
            .into_iter()
            .filter(|md5| match self.lookup(md5) {
                Some(beatmap) => beatmap.temp,
                None => true,
            })
            .collect();

        if !missing.is_empty() {
            debug!(missing = missing.len(), "collections reference beatmaps not stored locally");
        }

        missing
    }

    /// Search over fetched records: resolve the candidate hashes, apply the
    /// uniqueness filter and the advanced filters, then sort.
    pub fn search_beatmaps(&self, options: &BeatmapFilter) -> SearchResponse {
        let candidates: Vec<String> = match options.collection.as_deref() {
            Some(name) => self
                .collections
                .get(name)
                .map(|c| c.beatmaps.clone())
                .unwrap_or_default(),
            None => self.all_checksums(),
        };

        if candidates.is_empty() {
            return SearchResponse::default();
        }

        let mut seen_checksums = HashSet::new();
        let mut seen_unique_keys = HashSet::new();
        let mut valid: Vec<Beatmap> = Vec::new();
        let mut invalid: Vec<String> = Vec::new();

        for md5 in candidates {
            if !seen_checksums.insert(md5.clone()) {
                continue;
            }

            let Some(beatmap) = self.lookup(&md5) else {
                invalid.push(md5);
                continue;
            };

            if options.unique {
                match beatmap.unique_key() {
                    // no computable key: dropped silently
                    None => continue,
                    Some(key) => {
                        if seen_unique_keys.contains(&key) {
                            continue;
                        }
                        seen_unique_keys.insert(key);
                    }
                }
            }

            if !filter_beatmap(beatmap, options) {
                invalid.push(md5);
                continue;
            }

            valid.push(beatmap.clone());
        }

        let sorted = match options.sort.as_deref() {
            Some(key) => sort_beatmaps(valid, key),
            None => valid,
        };

        SearchResponse {
            beatmaps: sorted.into_iter().map(|b| b.md5).collect(),
            invalid,
        }
    }

    /// Search beatmapsets: prefilter ids by metadata or member difficulty
    /// text, then keep the member difficulties that pass the filters.
    pub fn search_beatmapsets(&self, options: &BeatmapSetFilter) -> SetSearchResponse {
        let mut ids: Vec<i32> = self.list_beatmapsets().iter().map(|s| s.online_id).collect();

        if ids.is_empty() {
            return SetSearchResponse::default();
        }

        if let Some(query) = options.query.as_deref() {
            if !query.trim().is_empty() {
                ids = self.filter_set_ids_by_query(&ids, query);
                if ids.is_empty() {
                    return SetSearchResponse::default();
                }
            }
        }

        let fetched = self.fetch_beatmapsets(&ids);
        let mut valid: Vec<BeatmapSet> = Vec::new();
        let mut invalid: Vec<i32> = fetched.invalid;

        let member_filter = BeatmapFilter {
            query: options.query.clone(),
            ..Default::default()
        };

        for set in fetched.beatmapsets {
            let members: Vec<String> = set
                .beatmaps
                .iter()
                .filter(|md5| {
                    self.lookup(md5)
                        .map(|b| filter_beatmap(b, &member_filter))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();

            if members.is_empty() {
                invalid.push(set.online_id);
            } else {
                valid.push(BeatmapSet {
                    beatmaps: members,
                    ..set
                });
            }
        }

        let sorted = match options.sort.as_deref() {
            Some(key) => sort_beatmapsets(valid, key),
            None => valid,
        };

        SetSearchResponse {
            beatmapsets: sorted,
            invalid,
        }
    }

    fn filter_set_ids_by_query(&self, ids: &[i32], query: &str) -> Vec<i32> {
        let query = query.to_lowercase();
        let mut filtered = Vec::new();

        for id in ids {
            let Some(set) = self.beatmapset(*id) else {
                continue;
            };

            let matches_metadata = set.metadata.artist.to_lowercase().contains(&query)
                || set.metadata.title.to_lowercase().contains(&query)
                || set.metadata.creator.to_lowercase().contains(&query);

            let matches_member = set.beatmaps.iter().any(|md5| {
                self.lookup(md5).is_some_and(|b| {
                    b.difficulty.to_lowercase().contains(&query)
                        || b.tags.to_lowercase().contains(&query)
                        || b.source.to_lowercase().contains(&query)
                })
            });

            if matches_metadata || matches_member {
                filtered.push(*id);
            }
        }

        filtered
    }
}

/// The uniform query/mutation surface over one storage backend.
///
/// Backend-specific behavior (scanning, persistence, file resolution) is
/// required; everything else is provided over the shared [`DriverState`].
pub trait Driver {
    fn state(&self) -> &DriverState;
    fn state_mut(&mut self) -> &mut DriverState;
    fn config(&self) -> &Config;

    /// Full scan of the backing store into the canonical maps. A no-op when
    /// already initialized, unless `force` is set.
    fn initialize(&mut self, force: bool) -> Result<()>;

    fn player_name(&self) -> String;

    /// Flush the collections to the backing store. Failures are logged and
    /// surfaced as `false`, never propagated.
    fn persist_collections(&mut self) -> bool;

    /// Compact the backing store by removing every pending-deletion record.
    /// Returns how many records were removed.
    fn purge_deleted(&mut self) -> Result<usize>;

    /// Resolve the on-disk location of one beatmap's playable file.
    fn beatmap_file(&self, md5: &str) -> Result<PathBuf>;

    /// Resolve the files backing a whole set, for packaging/export.
    fn beatmapset_files(&self, id: i32) -> Result<Vec<BeatmapFile>>;

    /// Release backing-store handles; the driver must be re-initialized
    /// before further use.
    fn dispose(&mut self) -> Result<()>;

    fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    fn should_update(&self) -> bool {
        self.state().should_update
    }

    fn add_collection(&mut self, name: &str, beatmaps: Vec<String>) -> bool {
        self.state_mut().add_collection(name, beatmaps)
    }

    fn rename_collection(&mut self, old_name: &str, new_name: &str) -> bool {
        self.state_mut().rename_collection(old_name, new_name)
    }

    fn delete_collection(&mut self, name: &str) -> bool {
        self.state_mut().delete_collection(name)
    }

    fn collection(&self, name: &str) -> Option<&Collection> {
        self.state().collections.get(name)
    }

    fn collections(&self) -> Vec<&Collection> {
        self.state().collections.values().collect()
    }

    fn add_beatmaps_to_collection(&mut self, name: &str, hashes: &[String]) -> bool {
        self.state_mut().add_beatmaps_to_collection(name, hashes)
    }

    fn add_beatmap(&mut self, beatmap: Beatmap) -> bool {
        self.state_mut().add_beatmap(beatmap)
    }

    fn delete_beatmap(&mut self, md5: &str, collection: Option<&str>) -> bool {
        self.state_mut().delete_beatmap(md5, collection)
    }

    fn has_beatmap(&self, md5: &str) -> bool {
        self.state().has_beatmap(md5)
    }

    fn has_beatmapset(&self, id: i32) -> bool {
        self.state().has_beatmapset(id)
    }

    fn has_beatmapsets(&self, ids: &[i32]) -> Vec<bool> {
        ids.iter().map(|id| self.has_beatmapset(*id)).collect()
    }

    fn beatmap_by_md5(&self, md5: &str) -> Option<Beatmap> {
        self.state().lookup(md5).cloned()
    }

    fn beatmap_by_id(&self, id: i32) -> Option<Beatmap> {
        self.state().beatmap_by_id(id).cloned()
    }

    fn beatmapset(&self, id: i32) -> Option<BeatmapSet> {
        self.state().beatmapset(id).cloned()
    }

    fn beatmaps(&self) -> Vec<Beatmap> {
        self.state().list_beatmaps()
    }

    fn beatmapsets(&self) -> Vec<BeatmapSet> {
        self.state().list_beatmapsets()
    }

    fn fetch_beatmaps(&self, checksums: &[String]) -> FetchResult {
        self.state().fetch_beatmaps(checksums)
    }

    fn fetch_beatmapsets(&self, ids: &[i32]) -> SetFetchResult {
        self.state().fetch_beatmapsets(ids)
    }

    fn search_beatmaps(&self, options: &BeatmapFilter) -> SearchResponse {
        self.state().search_beatmaps(options)
    }

    fn search_beatmapsets(&self, options: &BeatmapSetFilter) -> SetSearchResponse {
        self.state().search_beatmapsets(options)
    }

    fn missing_beatmaps(&self, collection: Option<&str>) -> Vec<String> {
        self.state().missing_beatmaps(collection)
    }

    /// Export one set as an `.osz` archive under the export directory.
    fn export_beatmapset(&self, id: i32) -> Result<PathBuf> {
        let files = self.beatmapset_files(id)?;
        exporter::export_beatmapset(self.config(), id, &files)
    }

    /// Export collections to a new file under the export directory, in
    /// either list format.
    fn export_collections(&self, names: &[String], format: ExportFormat) -> Result<PathBuf> {
        let state = self.state();
        let collections: Vec<Collection> = names
            .iter()
            .filter_map(|name| state.collections.get(name).cloned())
            .collect();

        exporter::export_collections(
            self.config(),
            &collections,
            format,
            &self.player_name(),
            |md5| state.lookup(md5).cloned(),
        )
    }
}

/// Construct the driver for the configured backend.
pub fn create_driver(config: &Config) -> Box<dyn Driver> {
    match config.backend {
        BackendKind::Stable => Box::new(StableDriver::new(config.clone())),
        BackendKind::Modern => Box::new(ModernDriver::new(config.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::Status;

    fn record(md5: &str, set_id: i32, title: &str, artist: &str) -> Beatmap {
        Beatmap {
            md5: md5.to_string(),
            beatmapset_id: set_id,
            title: title.to_string(),
            artist: artist.to_string(),
            creator: "mapper".to_string(),
            difficulty: "Hard".to_string(),
            status: Status::Ranked,
            star_rating: 5.0,
            audio: format!("{set_id}.mp3"),
            unique_id: format!("{set_id}_{md5}"),
            ..Default::default()
        }
    }

    fn seeded_state() -> DriverState {
        let mut state = DriverState::new();

        for (md5, set_id, title, artist) in [
            ("a1".repeat(16), 1, "first song", "glass beach"),
            ("b2".repeat(16), 1, "first song", "glass beach"),
            ("c3".repeat(16), 2, "second song", "weatherday"),
        ] {
            let beatmap = record(&md5, set_id, title, artist);
            state
                .beatmapsets
                .entry(set_id)
                .or_insert_with(|| BeatmapSet {
                    online_id: set_id,
                    metadata: BeatmapSetMetadata {
                        artist: artist.to_string(),
                        title: title.to_string(),
                        creator: "mapper".to_string(),
                    },
                    beatmaps: Vec::new(),
                    temp: false,
                })
                .beatmaps
                .push(md5.clone());
            state.beatmaps.insert(md5, beatmap);
        }

        state
    }

    #[test]
    fn test_collection_crud_marks_dirty() {
        let mut state = seeded_state();
        assert!(!state.should_update);

        assert!(state.add_collection("picks", vec!["a1".repeat(16)]));
        assert!(state.should_update);
        assert!(!state.add_collection("picks", Vec::new()));

        assert!(state.rename_collection("picks", "favorites"));
        assert!(!state.rename_collection("missing", "x"));
        assert!(state.collections.contains_key("favorites"));

        assert!(state.delete_collection("favorites"));
        assert!(!state.delete_collection("favorites"));
    }

    #[test]
    fn test_overlay_add_is_visible_everywhere() {
        let mut state = seeded_state();
        let fresh = record(&"d4".repeat(16), 9, "downloaded", "porter robinson");
        assert!(state.add_beatmap(fresh));

        // lookup marks the record as temp
        let found = state.lookup(&"d4".repeat(16)).unwrap();
        assert!(found.temp);

        // appears in the full listing
        assert!(state.list_beatmaps().iter().any(|b| b.md5 == "d4".repeat(16)));

        // found by a text search on its title
        let response = state.search_beatmaps(&BeatmapFilter {
            query: Some("downloaded".to_string()),
            ..Default::default()
        });
        assert_eq!(response.beatmaps, vec!["d4".repeat(16)]);

        // and its synthesized set shows up too
        assert!(state.beatmapset(9).is_some());
    }

    #[test]
    fn test_add_beatmap_rejects_malformed_hash() {
        let mut state = seeded_state();
        assert!(!state.add_beatmap(record("not-a-hash", 3, "x", "y")));
        assert!(state.temp_beatmaps.is_empty());
    }

    #[test]
    fn test_add_beatmap_clones_existing_set() {
        let mut state = seeded_state();
        let extra = record(&"d4".repeat(16), 1, "first song", "glass beach");
        state.add_beatmap(extra);

        let set = state.temp_beatmapsets.get(&1).unwrap();
        assert!(set.temp);
        assert_eq!(set.beatmaps.len(), 3);
    }

    #[test]
    fn test_pending_deletion_hides_record() {
        let mut state = seeded_state();
        let md5 = "a1".repeat(16);

        assert!(state.delete_beatmap(&md5, None));
        assert!(state.lookup(&md5).is_none());
        assert!(!state.has_beatmap(&md5));
        assert!(!state.list_beatmaps().iter().any(|b| b.md5 == md5));
        assert!(state.pending_deletion.contains(&md5));
    }

    #[test]
    fn test_delete_scoped_to_collection() {
        let mut state = seeded_state();
        let md5 = "a1".repeat(16);
        state.add_collection("picks", vec![md5.clone(), "c3".repeat(16)]);
        state.should_update = false;

        assert!(state.delete_beatmap(&md5, Some("picks")));
        assert!(state.should_update);
        assert_eq!(state.collections.get("picks").unwrap().beatmaps.len(), 1);

        // the record itself is untouched
        assert!(state.lookup(&md5).is_some());
    }

    #[test]
    fn test_fetch_reports_unresolved() {
        let state = seeded_state();
        let result =
            state.fetch_beatmaps(&["a1".repeat(16), "ff".repeat(16)]);
        assert_eq!(result.beatmaps.len(), 1);
        assert_eq!(result.invalid, vec!["ff".repeat(16)]);
    }

    #[test]
    fn test_search_scoped_to_collection_keeps_order() {
        let mut state = seeded_state();
        state.add_collection(
            "ordered",
            vec!["c3".repeat(16), "a1".repeat(16), "ff".repeat(16)],
        );

        let response = state.search_beatmaps(&BeatmapFilter {
            collection: Some("ordered".to_string()),
            ..Default::default()
        });

        assert_eq!(response.beatmaps, vec!["c3".repeat(16), "a1".repeat(16)]);
        assert_eq!(response.invalid, vec!["ff".repeat(16)]);
    }

    #[test]
    fn test_unique_filter_keeps_first_seen() {
        let mut state = seeded_state();
        // two difficulties in set 1 share one unique key
        for beatmap in state.beatmaps.values_mut() {
            if beatmap.beatmapset_id == 1 {
                beatmap.unique_id = "1_shared.mp3".to_string();
            }
        }

        let response = state.search_beatmaps(&BeatmapFilter {
            unique: true,
            ..Default::default()
        });

        let from_set_one: Vec<_> = response
            .beatmaps
            .iter()
            .filter(|md5| md5.as_str() != "c3".repeat(16))
            .collect();
        assert_eq!(from_set_one.len(), 1);
        // iteration order over the canonical map: "a1..." precedes "b2..."
        assert_eq!(from_set_one[0], &"a1".repeat(16));
    }

    #[test]
    fn test_unique_filter_drops_keyless_records() {
        let mut state = seeded_state();
        for beatmap in state.beatmaps.values_mut() {
            beatmap.unique_id.clear();
            beatmap.audio.clear();
        }

        let response = state.search_beatmaps(&BeatmapFilter {
            unique: true,
            ..Default::default()
        });
        assert!(response.beatmaps.is_empty());
        assert!(response.invalid.is_empty());
    }

    #[test]
    fn test_search_beatmapsets_by_member_text() {
        let state = seeded_state();

        let response = state.search_beatmapsets(&BeatmapSetFilter {
            query: Some("weatherday".to_string()),
            ..Default::default()
        });

        assert_eq!(response.beatmapsets.len(), 1);
        assert_eq!(response.beatmapsets[0].online_id, 2);
    }

    #[test]
    fn test_missing_beatmaps() {
        let mut state = seeded_state();
        state.add_collection(
            "wishlist",
            vec!["a1".repeat(16), "ff".repeat(16)],
        );

        // temp records also count as missing from the backing store
        state.add_beatmap(record(&"d4".repeat(16), 5, "temp", "x"));
        state.add_beatmaps_to_collection("wishlist", &["d4".repeat(16)]);

        let mut missing = state.missing_beatmaps(Some("wishlist"));
        missing.sort();
        let mut expected = vec!["d4".repeat(16), "ff".repeat(16)];
        expected.sort();
        assert_eq!(missing, expected);

        // the all-collections variant walks every list
        let mut missing_everywhere = state.missing_beatmaps(None);
        missing_everywhere.sort();
        assert_eq!(missing_everywhere, expected);
    }
}
