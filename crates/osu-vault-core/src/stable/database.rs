//! Parser for osu!stable's osu!.db binary format
//!
//! File layout:
//! - i32: format version
//! - i32: folder count
//! - bool: account unlocked
//! - i64: account unlock timestamp
//! - String: player name (presence-flagged)
//! - i32: beatmap count, then that many beatmap records
//! - i32: permission (skipped, not modeled)
//!
//! The per-beatmap layout is version-gated; see [`parse_beatmap`]. Byte
//! spans of every record are kept so the database can be rewritten with a
//! subset of records spliced out.

use crate::beatmap::{common_bpm, TimingPoint};
use crate::binary::{self, Cursor};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use tracing::debug;

/// Versions below this prefix every beatmap record with an entry-size i32.
pub const ENTRY_SIZE_CUTOFF: i32 = 20191106;
/// Versions below this store AR/CS/HP/OD as single bytes instead of f32.
pub const FLOAT_DIFFICULTY_CUTOFF: i32 = 20140609;
/// Versions from this on store star ratings as f32 (10-byte entries instead of 14).
pub const COMPACT_RATINGS_CUTOFF: i32 = 20250107;

/// Number of rulesets with a star-rating list per beatmap.
const RULESET_COUNT: usize = 4;

/// One beatmap record as parsed from osu!.db.
#[derive(Debug, Clone, Default)]
pub struct StableBeatmap {
    pub entry: i32,
    pub artist: String,
    pub artist_unicode: String,
    pub title: String,
    pub title_unicode: String,
    pub creator: String,
    pub difficulty: String,
    pub audio_file_name: String,
    pub md5: String,
    pub file: String,
    pub status: u8,
    pub hitcircles: u16,
    pub sliders: u16,
    pub spinners: u16,
    pub last_modification: i64,
    pub ar: f32,
    pub cs: f32,
    pub hp: f32,
    pub od: f32,
    pub slider_velocity: f64,
    /// No-mod star rating per ruleset (osu!, taiko, catch, mania).
    pub star_rating: [f64; RULESET_COUNT],
    pub drain_time: i32,
    /// Total length in milliseconds.
    pub length: i32,
    pub audio_preview: i32,
    /// Representative tempo derived from the timing points.
    pub bpm: f64,
    pub difficulty_id: i32,
    pub beatmapset_id: i32,
    pub thread_id: i32,
    pub grade_standard: u8,
    pub grade_taiko: u8,
    pub grade_catch: u8,
    pub grade_mania: u8,
    pub local_offset: i16,
    pub stack_leniency: f32,
    pub mode: u8,
    pub source: String,
    pub tags: String,
    pub online_offset: i16,
    pub font: String,
    pub unplayed: bool,
    pub last_played: i64,
    pub is_osz2: bool,
    pub folder_name: String,
    pub last_checked: i64,
    pub ignore_sounds: bool,
    pub ignore_skin: bool,
    pub disable_storyboard: bool,
    pub disable_video: bool,
    pub visual_override: bool,
    pub mania_scroll_speed: u8,

    /// `{beatmapset_id}_{audio_file_name}`, see [`crate::beatmap::Beatmap::unique_key`].
    pub unique_id: String,
    /// Relative to the songs directory.
    pub audio_path: PathBuf,
    /// Relative to the songs directory.
    pub file_path: PathBuf,

    /// Byte range of this record inside the database buffer.
    pub span: (usize, usize),
}

/// A beatmapset derived while streaming beatmap records: the first-seen
/// difficulty's metadata becomes the set's representative metadata.
#[derive(Debug, Clone, Default)]
pub struct StableBeatmapSet {
    pub title: String,
    pub artist: String,
    pub creator: String,
    pub online_id: i32,
    pub beatmaps: Vec<String>,
}

/// The fully parsed stable database.
#[derive(Debug, Default)]
pub struct StableDatabase {
    pub version: i32,
    pub folders: i32,
    pub account_unlocked: bool,
    pub last_unlocked_time: i64,
    pub player_name: Option<String>,
    pub beatmaps_count: u32,
    pub beatmaps: BTreeMap<String, StableBeatmap>,
    /// Derived, not stored on disk: beatmaps grouped by owning set id.
    pub beatmapsets: BTreeMap<i32, StableBeatmapSet>,
    /// Offset of the first beatmap record (end of the header).
    pub beatmaps_start: usize,
}

/// Parse a full osu!.db buffer.
pub fn parse_database(buf: &[u8]) -> Result<StableDatabase> {
    let mut cursor = Cursor::new(buf);

    let version = cursor.i32()?;
    let folders = cursor.i32()?;
    let account_unlocked = cursor.bool()?;
    let last_unlocked_time = cursor.i64()?;
    let player_name = cursor.string()?;
    let count = cursor.i32()?;

    if count < 0 {
        return Err(Error::StableParse(format!("invalid beatmap count {count}")));
    }

    let beatmaps_start = cursor.offset();
    let mut beatmaps = BTreeMap::new();
    let mut beatmapsets: BTreeMap<i32, StableBeatmapSet> = BTreeMap::new();

    for _ in 0..count {
        let beatmap = parse_beatmap(&mut cursor, version)?;

        match beatmapsets.get_mut(&beatmap.beatmapset_id) {
            Some(set) => set.beatmaps.push(beatmap.md5.clone()),
            None => {
                beatmapsets.insert(
                    beatmap.beatmapset_id,
                    StableBeatmapSet {
                        title: beatmap.title.clone(),
                        artist: beatmap.artist.clone(),
                        creator: beatmap.creator.clone(),
                        online_id: beatmap.beatmapset_id,
                        beatmaps: vec![beatmap.md5.clone()],
                    },
                );
            }
        }

        beatmaps.insert(beatmap.md5.clone(), beatmap);
    }

    // trailing permission field, read and discarded
    cursor.i32()?;

    debug!(version, beatmaps = beatmaps.len(), sets = beatmapsets.len(), "parsed stable database");

    Ok(StableDatabase {
        version,
        folders,
        account_unlocked,
        last_unlocked_time,
        player_name,
        beatmaps_count: count as u32,
        beatmaps,
        beatmapsets,
        beatmaps_start,
    })
}

/// Parse one beatmap record at the cursor's position.
pub fn parse_beatmap(cursor: &mut Cursor<'_>, version: i32) -> Result<StableBeatmap> {
    let start = cursor.offset();
    let byte_difficulties = version < FLOAT_DIFFICULTY_CUTOFF;

    let mut data = StableBeatmap {
        entry: if version < ENTRY_SIZE_CUTOFF { cursor.i32()? } else { 0 },
        ..Default::default()
    };

    data.artist = cursor.string()?.unwrap_or_default();
    data.artist_unicode = cursor.string()?.unwrap_or_default();
    data.title = cursor.string()?.unwrap_or_default();
    data.title_unicode = cursor.string()?.unwrap_or_default();
    data.creator = cursor.string()?.unwrap_or_default();
    data.difficulty = cursor.string()?.unwrap_or_default();
    data.audio_file_name = cursor.string()?.unwrap_or_default();
    data.md5 = cursor.string()?.unwrap_or_default();
    data.file = cursor.string()?.unwrap_or_default();
    data.status = cursor.u8()?;
    data.hitcircles = cursor.u16()?;
    data.sliders = cursor.u16()?;
    data.spinners = cursor.u16()?;
    data.last_modification = cursor.i64()?;

    data.ar = if byte_difficulties { f32::from(cursor.u8()?) } else { cursor.f32()? };
    data.cs = if byte_difficulties { f32::from(cursor.u8()?) } else { cursor.f32()? };
    data.hp = if byte_difficulties { f32::from(cursor.u8()?) } else { cursor.f32()? };
    data.od = if byte_difficulties { f32::from(cursor.u8()?) } else { cursor.f32()? };

    data.slider_velocity = cursor.f64()?;

    let compact_ratings = version >= COMPACT_RATINGS_CUTOFF;

    for rating in data.star_rating.iter_mut() {
        let length = cursor.i32()?;

        if length > 0 {
            cursor.u8()?; // type tag
            cursor.i32()?; // mod bitmask
            cursor.u8()?; // type tag

            // only the no-mod baseline is kept; per-mod pairs are skipped
            *rating = if compact_ratings {
                f64::from(cursor.f32()?)
            } else {
                cursor.f64()?
            };

            let stride = if compact_ratings { 10 } else { 14 };
            cursor.skip(stride * (length as usize - 1))?;
        }
    }

    data.drain_time = cursor.i32()?;
    data.length = cursor.i32()?;
    data.audio_preview = cursor.i32()?;

    let timing_points_count = cursor.i32()?;
    let mut timing_points = Vec::with_capacity(timing_points_count.max(0) as usize);

    for _ in 0..timing_points_count {
        timing_points.push(TimingPoint {
            beat_length: cursor.f64()?,
            offset: cursor.f64()?,
            inherited: cursor.bool()?,
        });
    }

    data.bpm = common_bpm(&timing_points, data.length);

    data.difficulty_id = cursor.i32()?;
    data.beatmapset_id = cursor.i32()?;
    data.thread_id = cursor.i32()?;
    data.grade_standard = cursor.u8()?;
    data.grade_taiko = cursor.u8()?;
    data.grade_catch = cursor.u8()?;
    data.grade_mania = cursor.u8()?;
    data.local_offset = cursor.i16()?;
    data.stack_leniency = cursor.f32()?;
    data.mode = cursor.u8()?;
    data.source = cursor.string()?.unwrap_or_default();
    data.tags = cursor.string()?.unwrap_or_default();
    data.online_offset = cursor.i16()?;
    data.font = cursor.string()?.unwrap_or_default();
    data.unplayed = cursor.bool()?;
    data.last_played = cursor.i64()?;
    data.is_osz2 = cursor.bool()?;
    data.folder_name = cursor.string()?.unwrap_or_default();
    data.last_checked = cursor.i64()?;
    data.ignore_sounds = cursor.bool()?;
    data.ignore_skin = cursor.bool()?;
    data.disable_storyboard = cursor.bool()?;
    data.disable_video = cursor.bool()?;
    data.visual_override = cursor.bool()?;

    if version < FLOAT_DIFFICULTY_CUTOFF {
        // obsolete short, meaning unknown; consume and discard
        cursor.i16()?;
    }

    // duplicated last-modification int
    cursor.skip(4)?;

    data.mania_scroll_speed = cursor.u8()?;

    data.unique_id = format!("{}_{}", data.beatmapset_id, data.audio_file_name);
    data.audio_path = PathBuf::from(&data.folder_name).join(&data.audio_file_name);
    data.file_path = PathBuf::from(&data.folder_name).join(&data.file);
    data.span = (start, cursor.offset());

    Ok(data)
}

/// Rewrite a database buffer with the given beatmaps removed.
///
/// The header is re-serialized with an adjusted count; everything else is
/// copied byte-for-byte from the original buffer, skipping the spans of the
/// removed records. Hashes not present in the database are ignored.
pub fn write_database(
    buf: &[u8],
    db: &StableDatabase,
    removed: &HashSet<String>,
) -> Result<Vec<u8>> {
    if db.beatmaps_start > buf.len() {
        return Err(Error::StableParse(
            "database buffer does not match parsed image".to_string(),
        ));
    }

    let mut spans: Vec<(usize, usize)> = removed
        .iter()
        .filter_map(|hash| db.beatmaps.get(hash).map(|b| b.span))
        .collect();
    spans.sort_unstable();

    if spans.iter().any(|&(_, end)| end > buf.len()) {
        return Err(Error::StableParse(
            "beatmap span out of range".to_string(),
        ));
    }

    let retained = db.beatmaps_count.saturating_sub(spans.len() as u32);

    let mut chunks = vec![
        binary::write_i32(db.version),
        binary::write_i32(db.folders),
        binary::write_bool(db.account_unlocked),
        binary::write_i64(db.last_unlocked_time),
        binary::write_string(db.player_name.as_deref()),
        binary::write_i32(retained as i32),
    ];

    let mut last = db.beatmaps_start;
    for (span_start, span_end) in spans {
        if last < span_start {
            chunks.push(buf[last..span_start].to_vec());
        }
        last = last.max(span_end);
    }
    if last < buf.len() {
        chunks.push(buf[last..].to_vec());
    }

    Ok(binary::join(chunks))
}
