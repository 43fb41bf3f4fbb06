//! Sorting over canonical records
//!
//! Only an explicit allow-list of property names is sortable; any other key
//! returns the input unchanged. Text keys compare case-folded with
//! combining diacritical marks stripped; numeric keys sort descending.
//! Records with an empty/missing key go to the end either way.

use crate::beatmap::{Beatmap, BeatmapSet};
use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;

/// Property names accepted by the sort engine.
pub const ALLOWED_SORT_KEYS: [&str; 8] =
    ["title", "artist", "duration", "length", "ar", "cs", "od", "hp"];

/// NFD-decompose, strip combining marks, lowercase.
fn normalize_text(text: &str) -> String {
    text.nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>()
        .to_lowercase()
}

/// Compare two text keys, pushing empty values to the end.
fn compare_text(a: &str, b: &str) -> Ordering {
    let a = normalize_text(a);
    let b = normalize_text(b);

    match (a.is_empty(), b.is_empty()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
        (false, false) => a.cmp(&b),
    }
}

/// Compare two numeric keys descending, pushing non-finite values to the end.
fn compare_number(a: f64, b: f64) -> Ordering {
    match (a.is_finite(), b.is_finite()) {
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        (false, false) => Ordering::Equal,
        (true, true) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

fn beatmap_number(beatmap: &Beatmap, key: &str) -> f64 {
    match key {
        "duration" => beatmap.duration,
        "length" => f64::from(beatmap.length),
        "ar" => f64::from(beatmap.ar),
        "cs" => f64::from(beatmap.cs),
        "od" => f64::from(beatmap.od),
        "hp" => f64::from(beatmap.hp),
        _ => f64::NAN,
    }
}

/// Sort beatmaps by an allow-listed property.
pub fn sort_beatmaps(mut beatmaps: Vec<Beatmap>, key: &str) -> Vec<Beatmap> {
    if !ALLOWED_SORT_KEYS.contains(&key) {
        return beatmaps;
    }

    match key {
        "title" => beatmaps.sort_by(|a, b| compare_text(&a.title, &b.title)),
        "artist" => beatmaps.sort_by(|a, b| compare_text(&a.artist, &b.artist)),
        _ => beatmaps
            .sort_by(|a, b| compare_number(beatmap_number(a, key), beatmap_number(b, key))),
    }

    beatmaps
}

/// Sort beatmapsets by an allow-listed property. Numeric keys do not exist
/// on set metadata, so only the text keys reorder anything.
pub fn sort_beatmapsets(mut sets: Vec<BeatmapSet>, key: &str) -> Vec<BeatmapSet> {
    if !ALLOWED_SORT_KEYS.contains(&key) {
        return sets;
    }

    match key {
        "title" => sets.sort_by(|a, b| compare_text(&a.metadata.title, &b.metadata.title)),
        "artist" => sets.sort_by(|a, b| compare_text(&a.metadata.artist, &b.metadata.artist)),
        _ => {}
    }

    sets
}
