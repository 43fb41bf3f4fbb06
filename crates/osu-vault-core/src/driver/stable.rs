//! Driver over the stable (flat binary) backend

use crate::beatmap::{Beatmap, BeatmapSet, BeatmapSetMetadata, GameMode, Status};
use crate::config::Config;
use crate::driver::{BeatmapFile, Driver, DriverState};
use crate::enrich::{Enricher, NoopEnricher};
use crate::error::{Error, Result};
use crate::stable::{self, StableBeatmap, StableBeatmapSet, StableDatabase};
use memmap2::Mmap;
use std::collections::HashSet;
use std::fs::File;
use std::path::PathBuf;
use tracing::{error, info, warn};
use walkdir::WalkDir;

const DATABASE_FILE: &str = "osu!.db";
const COLLECTION_FILE: &str = "collection.db";

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        "unknown".to_string()
    } else {
        value.to_string()
    }
}

fn build_beatmap(enricher: &dyn Enricher, beatmap: &StableBeatmap) -> Beatmap {
    let last_modified = beatmap.last_modification.to_string();
    let enriched = enricher.enrich(&beatmap.md5, &last_modified).unwrap_or_default();

    Beatmap {
        md5: beatmap.md5.clone(),
        online_id: beatmap.difficulty_id,
        beatmapset_id: beatmap.beatmapset_id,
        title: or_unknown(&beatmap.title),
        artist: or_unknown(&beatmap.artist),
        creator: or_unknown(&beatmap.creator),
        difficulty: or_unknown(&beatmap.difficulty),
        source: beatmap.source.clone(),
        tags: beatmap.tags.clone(),
        ar: beatmap.ar,
        cs: beatmap.cs,
        hp: beatmap.hp,
        od: beatmap.od,
        star_rating: beatmap
            .star_rating
            .get(beatmap.mode as usize)
            .copied()
            .unwrap_or(0.0),
        bpm: beatmap.bpm,
        length: beatmap.length,
        status: Status::from_stable_code(beatmap.status),
        mode: GameMode::from(beatmap.mode),
        temp: false,
        last_modified,
        unique_id: beatmap.unique_id.clone(),
        audio: enriched.audio,
        background: enriched.background,
        duration: enriched.duration,
    }
}

fn build_beatmapset(set: &StableBeatmapSet) -> BeatmapSet {
    BeatmapSet {
        online_id: set.online_id,
        metadata: BeatmapSetMetadata {
            artist: set.artist.clone(),
            title: set.title.clone(),
            creator: set.creator.clone(),
        },
        beatmaps: set.beatmaps.clone(),
        temp: false,
    }
}

/// Driver backed by the stable database files.
pub struct StableDriver {
    config: Config,
    state: DriverState,
    enricher: Box<dyn Enricher>,

    osu: Option<StableDatabase>,
    /// The mapped database file, kept for span-splicing rewrites.
    raw: Option<Mmap>,
    /// Every hash removed from the on-disk database so far. Spans are
    /// resolved against the original buffer, so removals accumulate across
    /// purges until the next full scan.
    purged: HashSet<String>,
}

impl StableDriver {
    pub fn new(config: Config) -> Self {
        Self::with_enricher(config, Box::new(NoopEnricher))
    }

    pub fn with_enricher(config: Config, enricher: Box<dyn Enricher>) -> Self {
        Self {
            config,
            state: DriverState::new(),
            enricher,
            osu: None,
            raw: None,
            purged: HashSet::new(),
        }
    }

    fn stable_path(&self) -> Result<PathBuf> {
        self.config
            .stable_path
            .clone()
            .ok_or_else(|| Error::Config("stable path not configured".to_string()))
    }

    fn songs_path(&self) -> Result<PathBuf> {
        self.config
            .songs_path()
            .ok_or_else(|| Error::Config("stable songs path not configured".to_string()))
    }

    fn database(&self) -> Result<&StableDatabase> {
        self.osu
            .as_ref()
            .ok_or_else(|| Error::Config("stable driver not initialized".to_string()))
    }
}

impl Driver for StableDriver {
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

        let stable_path = self.stable_path()?;
        let database_path = stable_path.join(DATABASE_FILE);
        let collection_path = stable_path.join(COLLECTION_FILE);

        if !database_path.exists() {
            return Err(Error::FileNotFound(database_path));
        }

        let file = File::open(&database_path)?;
        // SAFETY: the database file is mapped read-only and the game is not
        // running while this driver owns it.
        let mmap = unsafe { Mmap::map(&file)? };
        let osu = stable::parse_database(&mmap)?;

        let collections = if collection_path.exists() {
            stable::read_collections(&collection_path)?
        } else {
            Vec::new()
        };

        self.state.reset();

        for beatmap in osu.beatmaps.values() {
            let record = build_beatmap(self.enricher.as_ref(), beatmap);
            self.state.beatmaps.insert(record.md5.clone(), record);
        }
        for set in osu.beatmapsets.values() {
            self.state
                .beatmapsets
                .insert(set.online_id, build_beatmapset(set));
        }
        for collection in collections {
            self.state
                .collections
                .insert(collection.name.clone(), collection);
        }

        info!(
            beatmaps = self.state.beatmaps.len(),
            sets = self.state.beatmapsets.len(),
            collections = self.state.collections.len(),
            "initialized stable driver"
        );

        self.osu = Some(osu);
        self.raw = Some(mmap);
        self.purged.clear();
        self.state.initialized = true;

        Ok(())
    }

    fn player_name(&self) -> String {
        self.osu
            .as_ref()
            .and_then(|db| db.player_name.clone())
            .unwrap_or_default()
    }

    fn persist_collections(&mut self) -> bool {
        let collections: Vec<_> = self.state.collections.values().cloned().collect();

        let path = match self.stable_path() {
            Ok(path) => path.join(COLLECTION_FILE),
            Err(err) => {
                error!("failed to persist collections: {err}");
                return false;
            }
        };

        match stable::persist_collections(&path, &collections) {
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

        let raw = self
            .raw
            .as_ref()
            .ok_or_else(|| Error::Config("stable driver not initialized".to_string()))?;
        let osu = self
            .osu
            .as_ref()
            .ok_or_else(|| Error::Config("stable driver not initialized".to_string()))?;

        let mut purged = self.purged.clone();
        purged.extend(self.state.pending_deletion.iter().cloned());

        let rewritten = stable::write_database(raw, osu, &purged)?;
        let path = self.stable_path()?.join(DATABASE_FILE);
        std::fs::write(&path, rewritten)?;

        let removed = self.state.pending_deletion.len();
        self.purged = purged;
        self.state.pending_deletion.clear();

        info!(removed, "compacted stable database");
        Ok(removed)
    }

    fn beatmap_file(&self, md5: &str) -> Result<PathBuf> {
        let osu = self.database()?;
        let beatmap = osu
            .beatmaps
            .get(md5)
            .ok_or_else(|| Error::BeatmapNotFound(md5.to_string()))?;

        Ok(self.songs_path()?.join(&beatmap.file_path))
    }

    fn beatmapset_files(&self, id: i32) -> Result<Vec<BeatmapFile>> {
        let osu = self.database()?;
        let set = osu
            .beatmapsets
            .get(&id)
            .ok_or(Error::BeatmapSetNotFound(id))?;
        let songs = self.songs_path()?;

        // prefer the set's folder on disk: it has everything (backgrounds,
        // storyboards, hitsounds), not just what the database references
        if let Some(first) = set.beatmaps.first().and_then(|md5| osu.beatmaps.get(md5)) {
            let folder = songs.join(&first.folder_name);
            if folder.is_dir() {
                let mut files = Vec::new();
                for entry in WalkDir::new(&folder).into_iter().filter_map(|e| e.ok()) {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let name = entry
                        .path()
                        .strip_prefix(&folder)
                        .unwrap_or(entry.path())
                        .to_string_lossy()
                        .to_string();
                    files.push(BeatmapFile {
                        name,
                        location: entry.path().to_path_buf(),
                    });
                }
                return Ok(files);
            }
        }

        // fall back to the files the database knows about
        let mut files = Vec::new();
        for md5 in &set.beatmaps {
            let Some(beatmap) = osu.beatmaps.get(md5) else {
                continue;
            };

            files.push(BeatmapFile {
                name: beatmap.file.clone(),
                location: songs.join(&beatmap.file_path),
            });
            files.push(BeatmapFile {
                name: beatmap.audio_file_name.clone(),
                location: songs.join(&beatmap.audio_path),
            });

            if let Some(canonical) = self.state.beatmaps.get(md5) {
                if !canonical.background.is_empty() {
                    let location = PathBuf::from(&canonical.background);
                    if let Some(name) = location.file_name() {
                        files.push(BeatmapFile {
                            name: name.to_string_lossy().to_string(),
                            location,
                        });
                    }
                }
            }
        }

        if files.is_empty() {
            warn!(id, "no files resolved for beatmapset");
        }

        Ok(files)
    }

    fn dispose(&mut self) -> Result<()> {
        self.osu = None;
        self.raw = None;
        self.state.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;

    fn config(dir: &std::path::Path) -> Config {
        Config {
            stable_path: Some(dir.to_path_buf()),
            export_path: Some(dir.join("exports")),
            ..Default::default()
        }
    }

    #[test]
    fn test_initialize_requires_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = StableDriver::new(config(dir.path()));

        let err = driver.initialize(false).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
        assert!(!driver.is_initialized());
    }

    #[test]
    fn test_initialize_requires_configured_path() {
        let mut driver = StableDriver::new(Config {
            stable_path: None,
            ..Default::default()
        });
        assert!(matches!(driver.initialize(false), Err(Error::Config(_))));
    }

    #[test]
    fn test_persist_collections_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = StableDriver::new(config(dir.path()));

        driver.state_mut().collections.insert(
            "picks".to_string(),
            Collection::with_hashes("picks", vec!["ab".repeat(16)]),
        );
        driver.state_mut().should_update = true;

        assert!(driver.persist_collections());
        assert!(!driver.should_update());

        let written = stable::read_collections(&dir.path().join(COLLECTION_FILE)).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].name, "picks");
    }

    #[test]
    fn test_persist_collections_failure_is_boolean() {
        let mut driver = StableDriver::new(Config {
            stable_path: None,
            ..Default::default()
        });
        driver
            .state_mut()
            .collections
            .insert("picks".to_string(), Collection::new("picks"));

        assert!(!driver.persist_collections());
    }

    #[test]
    fn test_player_name_before_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let driver = StableDriver::new(config(dir.path()));
        assert_eq!(driver.player_name(), "");
    }
}
