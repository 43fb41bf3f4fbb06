//! Driver over the modern (embedded object store) backend

use crate::beatmap::{Beatmap, BeatmapSet, BeatmapSetMetadata, GameMode, Status};
use crate::config::Config;
use crate::driver::{BeatmapFile, Driver, DriverState};
use crate::enrich::{Enricher, NoopEnricher};
use crate::error::{Error, Result};
use crate::modern::{FileStore, ModernBeatmap, ModernBeatmapSet, ModernStore};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{error, info, warn};

const STORE_FILE: &str = "client.db";
const DEFAULT_PLAYER_NAME: &str = "guest";

fn build_beatmap(
    enricher: &dyn Enricher,
    record: &ModernBeatmap,
    owner: Option<&ModernBeatmapSet>,
) -> Beatmap {
    let last_modified = record.last_modified.to_string();
    let enriched = enricher.enrich(&record.md5, &last_modified).unwrap_or_default();

    let metadata = owner.map(|set| &set.metadata);
    let or_unknown = |value: Option<&String>| match value {
        Some(value) if !value.is_empty() => value.clone(),
        _ => "unknown".to_string(),
    };

    Beatmap {
        md5: record.md5.clone(),
        online_id: record.online_id,
        beatmapset_id: record.set_id,
        title: or_unknown(metadata.map(|m| &m.title)),
        artist: or_unknown(metadata.map(|m| &m.artist)),
        creator: or_unknown(metadata.map(|m| &m.creator)),
        difficulty: if record.difficulty.is_empty() {
            "unknown".to_string()
        } else {
            record.difficulty.clone()
        },
        source: record.source.clone(),
        tags: record.tags.clone(),
        ar: record.ar,
        cs: record.cs,
        hp: record.hp,
        od: record.od,
        star_rating: record.star_rating,
        bpm: record.bpm,
        length: record.length,
        status: Status::from_modern_code(record.status),
        mode: GameMode::from(record.ruleset),
        temp: false,
        last_modified,
        unique_id: String::new(),
        audio: enriched.audio,
        background: enriched.background,
        duration: enriched.duration,
    }
}

fn build_beatmapset(set: &ModernBeatmapSet) -> BeatmapSet {
    BeatmapSet {
        online_id: set.online_id,
        metadata: BeatmapSetMetadata {
            artist: set.metadata.artist.clone(),
            title: set.metadata.title.clone(),
            creator: set.metadata.creator.clone(),
        },
        beatmaps: set.beatmaps.clone(),
        temp: false,
    }
}

/// Driver backed by the modern embedded store and its content-addressed
/// file store.
pub struct ModernDriver {
    config: Config,
    state: DriverState,
    enricher: Box<dyn Enricher>,

    store: Option<ModernStore>,
    file_store: Option<FileStore>,
    /// Store-shaped set records cached at scan time, keyed by set id; used
    /// for file resolution and orphan detection.
    set_records: HashMap<i32, ModernBeatmapSet>,
    /// Playable-file content hash per beatmap, cached at scan time.
    file_hash_by_md5: HashMap<String, String>,
}

impl ModernDriver {
    pub fn new(config: Config) -> Self {
        Self::with_enricher(config, Box::new(NoopEnricher))
    }

    pub fn with_enricher(config: Config, enricher: Box<dyn Enricher>) -> Self {
        Self {
            config,
            state: DriverState::new(),
            enricher,
            store: None,
            file_store: None,
            set_records: HashMap::new(),
            file_hash_by_md5: HashMap::new(),
        }
    }

    fn modern_path(&self) -> Result<PathBuf> {
        self.config
            .modern_path
            .clone()
            .ok_or_else(|| Error::Config("modern path not configured".to_string()))
    }

    fn store(&self) -> Result<&ModernStore> {
        self.store
            .as_ref()
            .ok_or_else(|| Error::Config("modern driver not initialized".to_string()))
    }

    fn file_store(&self) -> Result<&FileStore> {
        self.file_store
            .as_ref()
            .ok_or_else(|| Error::Config("modern driver not initialized".to_string()))
    }

    /// Hashes present in the file store that no set's file usages reference.
    pub fn orphaned_files(&self) -> Result<Vec<String>> {
        let file_store = self.file_store()?;

        let referenced: HashSet<String> = self
            .set_records
            .values()
            .flat_map(|set| set.files.iter().map(|usage| usage.hash.to_lowercase()))
            .collect();

        let orphans: Vec<String> = file_store
            .list_all()?
            .into_iter()
            .filter(|hash| !referenced.contains(&hash.to_lowercase()))
            .collect();

        if !orphans.is_empty() {
            warn!(orphans = orphans.len(), "file store contains unreferenced files");
        }

        Ok(orphans)
    }
}

impl Driver for ModernDriver {
    fn state(&self) -> &DriverState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DriverState {
        &mut self.state
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn initialize(&mut self, force: bool) -> Result<()> {
        if self.state.initialized && !force {
            return Ok(());
        }

        let modern_path = self.modern_path()?;
        let store = ModernStore::open(&modern_path.join(STORE_FILE))?;
        let file_store = FileStore::new(&modern_path);

        let sets = store.beatmapsets()?;
        let beatmaps = store.beatmaps()?;
        let collections = store.collections()?;

        self.state.reset();
        self.set_records = sets.iter().map(|set| (set.online_id, set.clone())).collect();
        self.file_hash_by_md5 = beatmaps
            .iter()
            .map(|record| (record.md5.clone(), record.file_hash.clone()))
            .collect();

        // ownership is resolved through the side map, not back-references
        for record in &beatmaps {
            let owner = self.set_records.get(&record.set_id);
            let built = build_beatmap(self.enricher.as_ref(), record, owner);
            self.state.beatmaps.insert(built.md5.clone(), built);
        }
        for set in &sets {
            self.state
                .beatmapsets
                .insert(set.online_id, build_beatmapset(set));
        }
        for collection in collections {
            self.state.collections.insert(
                collection.name.clone(),
                crate::collection::Collection::with_hashes(collection.name, collection.beatmaps),
            );
        }

        info!(
            beatmaps = self.state.beatmaps.len(),
            sets = self.state.beatmapsets.len(),
            collections = self.state.collections.len(),
            "initialized modern driver"
        );

        self.store = Some(store);
        self.file_store = Some(file_store);
        self.state.initialized = true;

        Ok(())
    }

    fn player_name(&self) -> String {
        self.store
            .as_ref()
            .and_then(|store| store.player_name().ok().flatten())
            .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string())
    }

    fn persist_collections(&mut self) -> bool {
        let collections: Vec<_> = self.state.collections.values().cloned().collect();

        let store = match self.store() {
            Ok(store) => store,
            Err(err) => {
                error!("failed to persist collections: {err}");
                return false;
            }
        };

        match store.write_collections(&collections) {
            Ok(()) => {
                self.state.should_update = false;
                true
            }
            Err(err) => {
                error!("failed to persist collections: {err}");
                false
            }
        }
    }

    fn purge_deleted(&mut self) -> Result<usize> {
        if self.state.pending_deletion.is_empty() {
            return Ok(0);
        }

        let pending = self.state.pending_deletion.clone();
        let removed = self.store()?.delete_beatmaps(&pending)?;
        self.state.pending_deletion.clear();

        // keep the cached file usages consistent with the store
        for set in self.set_records.values_mut() {
            set.beatmaps.retain(|md5| !pending.contains(md5));
        }
        self.set_records.retain(|_, set| !set.beatmaps.is_empty());

        info!(removed, "purged deleted beatmaps from modern store");
        Ok(removed)
    }

    fn beatmap_file(&self, md5: &str) -> Result<PathBuf> {
        let hash = self
            .file_hash_by_md5
            .get(md5)
            .ok_or_else(|| Error::BeatmapNotFound(md5.to_string()))?;

        Ok(self.file_store()?.hash_to_path(hash))
    }

    fn beatmapset_files(&self, id: i32) -> Result<Vec<BeatmapFile>> {
        let file_store = self.file_store()?;
        let set = self
            .set_records
            .get(&id)
            .ok_or(Error::BeatmapSetNotFound(id))?;

        let mut files = Vec::new();
        for usage in &set.files {
            if usage.filename.is_empty() || usage.hash.is_empty() {
                warn!(id, "skipping file usage with missing name or hash");
                continue;
            }

            files.push(BeatmapFile {
                name: usage.filename.clone(),
                location: file_store.hash_to_path(&usage.hash),
            });
        }

        Ok(files)
    }

    fn dispose(&mut self) -> Result<()> {
        self.store = None;
        self.file_store = None;
        self.set_records.clear();
        self.file_hash_by_md5.clear();
        self.state.reset();
        Ok(())
    }
}
