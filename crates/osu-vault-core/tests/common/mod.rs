//! Shared fixtures: builds stable database files through the public binary
//! writer API, independently of the parser under test.

use md5::{Digest, Md5};
use osu_vault_core::binary::{
    join, write_bool, write_f32, write_f64, write_i16, write_i32, write_i64, write_string,
    write_u16, write_u8,
};
use std::fs;
use std::path::Path;

/// Database format version used by the fixtures (modern era: no entry-size
/// prefix, f32 difficulties, compact star ratings).
pub const FIXTURE_VERSION: i32 = 20250107;

#[derive(Clone)]
pub struct FixtureMap {
    pub artist: String,
    pub title: String,
    pub difficulty: String,
    pub md5: String,
    pub set_id: i32,
    pub online_id: i32,
    pub star_rating: f64,
    pub mode: u8,
    pub audio: String,
    pub folder: String,
}

impl FixtureMap {
    pub fn new(artist: &str, title: &str, set_id: i32, index: i32) -> Self {
        Self {
            artist: artist.to_string(),
            title: title.to_string(),
            difficulty: format!("Insane x{index}"),
            md5: fixture_hash(&format!("{artist}-{title}-{index}")),
            set_id,
            online_id: 1000 + index,
            star_rating: 4.5,
            mode: 0,
            audio: format!("{set_id}.mp3"),
            folder: format!("{set_id} {artist} - {title}"),
        }
    }
}

/// Deterministic 32-char hex hash for fixture identities.
pub fn fixture_hash(seed: &str) -> String {
    format!("{:x}", Md5::digest(seed.as_bytes()))
}

fn encode_map(map: &FixtureMap) -> Vec<u8> {
    let mut chunks: Vec<Vec<u8>> = Vec::new();

    chunks.push(write_string(Some(&map.artist)));
    chunks.push(write_string(Some(&map.artist)));
    chunks.push(write_string(Some(&map.title)));
    chunks.push(write_string(Some(&map.title)));
    chunks.push(write_string(Some("fixture mapper")));
    chunks.push(write_string(Some(&map.difficulty)));
    chunks.push(write_string(Some(&map.audio)));
    chunks.push(write_string(Some(&map.md5)));
    chunks.push(write_string(Some("beatmap.osu")));
    chunks.push(write_u8(4)); // ranked
    chunks.push(write_u16(100));
    chunks.push(write_u16(20));
    chunks.push(write_u16(4));
    chunks.push(write_i64(1_000));

    for value in [9.0f32, 4.0, 5.0, 8.0] {
        chunks.push(write_f32(value));
    }

    chunks.push(write_f64(1.4));

    // four ruleset star-rating lists, one no-mod entry each
    for _ in 0..4 {
        chunks.push(write_i32(1));
        chunks.push(write_u8(0x08));
        chunks.push(write_i32(0));
        chunks.push(write_u8(0x0c));
        chunks.push(write_f32(map.star_rating as f32));
    }

    chunks.push(write_i32(88_000)); // drain
    chunks.push(write_i32(92_000)); // total length
    chunks.push(write_i32(30_000)); // preview

    chunks.push(write_i32(1)); // one timing point, 170 BPM
    chunks.push(write_f64(60_000.0 / 170.0));
    chunks.push(write_f64(0.0));
    chunks.push(write_bool(true));

    chunks.push(write_i32(map.online_id));
    chunks.push(write_i32(map.set_id));
    chunks.push(write_i32(0));
    chunks.push(write_u8(0));
    chunks.push(write_u8(0));
    chunks.push(write_u8(0));
    chunks.push(write_u8(0));
    chunks.push(write_i16(0));
    chunks.push(write_f32(0.7));
    chunks.push(write_u8(map.mode));
    chunks.push(write_string(Some("")));
    chunks.push(write_string(Some("fixture tags")));
    chunks.push(write_i16(0));
    chunks.push(write_string(None));
    chunks.push(write_bool(true));
    chunks.push(write_i64(0));
    chunks.push(write_bool(false));
    chunks.push(write_string(Some(&map.folder)));
    chunks.push(write_i64(0));
    chunks.push(write_bool(false));
    chunks.push(write_bool(false));
    chunks.push(write_bool(false));
    chunks.push(write_bool(false));
    chunks.push(write_bool(false));
    chunks.push(write_i32(0)); // duplicated last-modification
    chunks.push(write_u8(1));

    join(chunks)
}

/// Serialize a full osu!.db buffer.
pub fn encode_database(player: &str, maps: &[FixtureMap]) -> Vec<u8> {
    let mut chunks = vec![
        write_i32(FIXTURE_VERSION),
        write_i32(maps.len() as i32),
        write_bool(true),
        write_i64(0),
        write_string(Some(player)),
        write_i32(maps.len() as i32),
    ];
    for map in maps {
        chunks.push(encode_map(map));
    }
    chunks.push(write_i32(0)); // permission
    join(chunks)
}

/// Write `osu!.db` into a stable installation directory.
pub fn write_stable_database(dir: &Path, player: &str, maps: &[FixtureMap]) {
    fs::write(dir.join("osu!.db"), encode_database(player, maps)).unwrap();
}

/// The standard fixture set: 18 "glass beach" difficulties across two sets,
/// plus unrelated records.
pub fn fixture_maps() -> Vec<FixtureMap> {
    let mut maps = Vec::new();

    for i in 0..10 {
        maps.push(FixtureMap::new("glass beach", "the CIA", 100, i));
    }
    for i in 10..18 {
        maps.push(FixtureMap::new("glass beach", "cul-de-sac", 101, i));
    }
    for i in 18..25 {
        maps.push(FixtureMap::new("weatherday", "agenda", 200 + i, i));
    }

    maps
}
