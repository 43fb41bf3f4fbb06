//! Canonical beatmap data structures
//!
//! Both storage backends are normalized into the records defined here, so
//! everything above the drivers (search, sorting, export) is
//! backend-independent.

mod status;
mod timing;

pub use status::*;
pub use timing::*;

use serde::{Deserialize, Serialize};

/// Represents a game mode (ruleset) in osu!
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Osu = 0,
    Taiko = 1,
    Catch = 2,
    Mania = 3,
}

impl GameMode {
    /// Ruleset name as shown to the user.
    pub fn name(self) -> &'static str {
        match self {
            GameMode::Osu => "Osu",
            GameMode::Taiko => "Taiko",
            GameMode::Catch => "Catch",
            GameMode::Mania => "Mania",
        }
    }

    /// Parse a ruleset name, defaulting to osu! for anything unknown.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "taiko" => GameMode::Taiko,
            "catch" | "ctb" | "fruits" => GameMode::Catch,
            "mania" => GameMode::Mania,
            _ => GameMode::Osu,
        }
    }
}

impl From<u8> for GameMode {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Taiko,
            2 => Self::Catch,
            3 => Self::Mania,
            _ => Self::Osu,
        }
    }
}

/// A canonical beatmap record, normalized from either backend.
///
/// The `md5` content hash is the primary key within one backend instance.
/// `temp` marks overlay records known to the running session but not yet
/// present in the backing store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Beatmap {
    pub md5: String,
    pub online_id: i32,
    pub beatmapset_id: i32,
    pub title: String,
    pub artist: String,
    pub creator: String,
    pub difficulty: String,
    pub source: String,
    pub tags: String,
    pub ar: f32,
    pub cs: f32,
    pub hp: f32,
    pub od: f32,
    pub star_rating: f64,
    pub bpm: f64,
    /// Total length in milliseconds.
    pub length: i32,
    pub status: Status,
    pub mode: GameMode,
    pub temp: bool,
    pub last_modified: String,

    /// `{beatmapset_id}_{audio_file}`, used to recognize "same audio,
    /// different difficulty" duplicates.
    pub unique_id: String,

    // Filled by the external enrichment collaborator, empty until then.
    pub audio: String,
    pub background: String,
    pub duration: f64,
}

impl Beatmap {
    /// Key used by the uniqueness filter: the explicit unique id when
    /// present, otherwise composed from the owning set and audio file.
    /// `None` when neither is available; such records are dropped by the
    /// uniqueness filter.
    pub fn unique_key(&self) -> Option<String> {
        if !self.unique_id.is_empty() {
            return Some(self.unique_id.clone());
        }
        if !self.audio.is_empty() {
            return Some(format!("{}_{}", self.beatmapset_id, self.audio));
        }
        None
    }
}

/// Representative metadata for a beatmapset, taken from the first difficulty
/// seen while scanning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeatmapSetMetadata {
    pub artist: String,
    pub title: String,
    pub creator: String,
}

/// A canonical beatmapset: a numeric online id plus the content hashes of
/// its member difficulties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeatmapSet {
    pub online_id: i32,
    pub metadata: BeatmapSetMetadata,
    pub beatmaps: Vec<String>,
    pub temp: bool,
}

/// Check that a string looks like a 32-character hex content hash.
pub fn is_valid_hash(hash: &str) -> bool {
    hash.len() == 32 && hex::decode(hash).is_ok()
}
