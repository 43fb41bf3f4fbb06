//! Codec for the third-party collection interchange format (`.osdb`)
//!
//! The file starts with a self-describing version token (a bare string).
//! Tokens ending in `min` disable several optional fields. For integer
//! codes >= 7 everything after the token is gzip-compressed, and the
//! decompressed stream begins with a redundant repeat of the token that is
//! consumed and discarded. The stream terminates with a fixed literal
//! footer; its absence is a fatal corruption error.

use crate::binary::{self, Cursor};
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Literal footer terminating every interchange file.
pub const FOOTER: &str = "By Piotrekol";

/// Interchange format versions, keyed by their header token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterchangeVersion {
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V7Min,
    V8Min,
}

impl InterchangeVersion {
    /// Every valid version, in token order.
    pub const ALL: [InterchangeVersion; 10] = [
        InterchangeVersion::V1,
        InterchangeVersion::V2,
        InterchangeVersion::V3,
        InterchangeVersion::V4,
        InterchangeVersion::V5,
        InterchangeVersion::V6,
        InterchangeVersion::V7,
        InterchangeVersion::V8,
        InterchangeVersion::V7Min,
        InterchangeVersion::V8Min,
    ];

    /// The header token written at the start of the file.
    pub fn token(self) -> &'static str {
        match self {
            InterchangeVersion::V1 => "o!dm",
            InterchangeVersion::V2 => "o!dm2",
            InterchangeVersion::V3 => "o!dm3",
            InterchangeVersion::V4 => "o!dm4",
            InterchangeVersion::V5 => "o!dm5",
            InterchangeVersion::V6 => "o!dm6",
            InterchangeVersion::V7 => "o!dm7",
            InterchangeVersion::V8 => "o!dm8",
            InterchangeVersion::V7Min => "o!dm7min",
            InterchangeVersion::V8Min => "o!dm8min",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.token() == token)
    }

    /// Numeric code used by every field-presence gate. The minimal variants
    /// sort above all regular codes, so they numerically pass the same gates
    /// as the newest regular version.
    pub fn code(self) -> u32 {
        match self {
            InterchangeVersion::V1 => 1,
            InterchangeVersion::V2 => 2,
            InterchangeVersion::V3 => 3,
            InterchangeVersion::V4 => 4,
            InterchangeVersion::V5 => 5,
            InterchangeVersion::V6 => 6,
            InterchangeVersion::V7 => 7,
            InterchangeVersion::V8 => 8,
            InterchangeVersion::V7Min => 1007,
            InterchangeVersion::V8Min => 1008,
        }
    }

    /// Minimal versions omit display metadata.
    pub fn is_minimal(self) -> bool {
        self.token().ends_with("min")
    }
}

/// One beatmap entry inside an interchange collection.
#[derive(Debug, Clone, Default)]
pub struct InterchangeBeatmap {
    pub difficulty_id: i32,
    /// -1 when the version predates set ids.
    pub beatmapset_id: i32,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub difficulty: Option<String>,
    pub md5: String,
    pub comment: Option<String>,
    pub mode: Option<u8>,
    pub star_rating: Option<f64>,
}

/// One collection inside an interchange file.
#[derive(Debug, Clone, Default)]
pub struct InterchangeCollection {
    pub name: String,
    pub online_id: Option<i32>,
    pub beatmaps: Vec<InterchangeBeatmap>,
    /// Hash-only hint list; may reference beatmaps not present locally.
    pub hash_only: Vec<String>,
}

/// A fully parsed interchange file.
#[derive(Debug, Clone)]
pub struct InterchangeFile {
    pub version: InterchangeVersion,
    /// Save timestamp in .NET ticks (opaque, round-tripped as-is).
    pub save_date: i64,
    pub last_editor: String,
    pub collections: Vec<InterchangeCollection>,
}

/// Read and parse an interchange file from disk.
pub fn read(path: &Path) -> Result<InterchangeFile> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let buf = fs::read(path)?;
    parse(&buf)
}

/// Parse an interchange buffer.
pub fn parse(buf: &[u8]) -> Result<InterchangeFile> {
    let mut cursor = Cursor::new(buf);

    let token = cursor.bare_string()?;
    let version =
        InterchangeVersion::from_token(&token).ok_or(Error::InvalidVersionToken(token))?;

    let decompressed;
    let mut cursor = if version.code() >= 7 {
        let mut decoder = GzDecoder::new(cursor.remaining());
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| Error::Other(format!("failed to decompress interchange body: {e}")))?;
        decompressed = out;

        let mut inner = Cursor::new(&decompressed);
        // the compressed stream repeats the version token
        inner.bare_string()?;
        inner
    } else {
        cursor
    };

    parse_body(&mut cursor, version)
}

fn parse_body(cursor: &mut Cursor<'_>, version: InterchangeVersion) -> Result<InterchangeFile> {
    let code = version.code();
    let minimal = version.is_minimal();

    let save_date = cursor.i64()?;
    let last_editor = cursor.bare_string()?;
    let count = cursor.i32()?;

    if count < 0 {
        return Err(Error::Other(format!("invalid collection count {count}")));
    }

    let mut collections = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let mut collection = InterchangeCollection {
            name: cursor.bare_string()?,
            ..Default::default()
        };

        if code >= 7 {
            collection.online_id = Some(cursor.i32()?);
        }

        let beatmap_count = cursor.i32()?;
        for _ in 0..beatmap_count {
            let mut beatmap = InterchangeBeatmap {
                difficulty_id: cursor.i32()?,
                beatmapset_id: if code >= 2 { cursor.i32()? } else { -1 },
                ..Default::default()
            };

            if !minimal {
                beatmap.artist = Some(cursor.bare_string()?);
                beatmap.title = Some(cursor.bare_string()?);
                beatmap.difficulty = Some(cursor.bare_string()?);
            }

            beatmap.md5 = cursor.bare_string()?;

            if code >= 4 {
                beatmap.comment = Some(cursor.bare_string()?);
            }
            if code >= 8 || (code >= 5 && !minimal) {
                beatmap.mode = Some(cursor.u8()?);
            }
            if code >= 8 || (code >= 6 && !minimal) {
                beatmap.star_rating = Some(cursor.f64()?);
            }

            collection.beatmaps.push(beatmap);
        }

        if code >= 3 {
            let hash_count = cursor.i32()?;
            for _ in 0..hash_count {
                collection.hash_only.push(cursor.bare_string()?);
            }
        }

        collections.push(collection);
    }

    let footer = cursor.bare_string()?;
    if footer != FOOTER {
        return Err(Error::CorruptedFooter);
    }

    debug!(version = version.token(), collections = collections.len(), "parsed interchange file");

    Ok(InterchangeFile {
        version,
        save_date,
        last_editor,
        collections,
    })
}

/// Serialize an interchange file at the given version.
///
/// For codes >= 7 the body (prefixed with a repeat of the version token) is
/// gzip-compressed and appended after the uncompressed token.
pub fn write(version: InterchangeVersion, file: &InterchangeFile) -> Result<Vec<u8>> {
    if file.collections.is_empty() {
        return Err(Error::Other("no collections to write".to_string()));
    }

    let code = version.code();
    let minimal = version.is_minimal();

    let mut body: Vec<Vec<u8>> = vec![
        binary::write_i64(file.save_date),
        binary::write_bare_string(&file.last_editor),
        binary::write_i32(file.collections.len() as i32),
    ];

    for collection in &file.collections {
        body.push(binary::write_bare_string(&collection.name));

        if code >= 7 {
            body.push(binary::write_i32(collection.online_id.unwrap_or(0)));
        }

        body.push(binary::write_i32(collection.beatmaps.len() as i32));

        for beatmap in &collection.beatmaps {
            body.push(binary::write_i32(beatmap.difficulty_id));

            if code >= 2 {
                body.push(binary::write_i32(beatmap.beatmapset_id));
            }
            if !minimal {
                body.push(binary::write_bare_string(beatmap.artist.as_deref().unwrap_or("")));
                body.push(binary::write_bare_string(beatmap.title.as_deref().unwrap_or("")));
                body.push(binary::write_bare_string(
                    beatmap.difficulty.as_deref().unwrap_or(""),
                ));
            }

            body.push(binary::write_bare_string(&beatmap.md5));

            if code >= 4 {
                body.push(binary::write_bare_string(beatmap.comment.as_deref().unwrap_or("")));
            }
            if code >= 8 || (code >= 5 && !minimal) {
                body.push(binary::write_u8(beatmap.mode.unwrap_or(0)));
            }
            if code >= 8 || (code >= 6 && !minimal) {
                body.push(binary::write_f64(beatmap.star_rating.unwrap_or(0.0)));
            }
        }

        if code >= 3 {
            body.push(binary::write_i32(collection.hash_only.len() as i32));
            for hash in &collection.hash_only {
                body.push(binary::write_bare_string(hash));
            }
        }
    }

    body.push(binary::write_bare_string(FOOTER));

    let token = binary::write_bare_string(version.token());
    let body_bytes = binary::join(body);

    if code >= 7 {
        let mut plain = binary::write_bare_string(version.token());
        plain.extend_from_slice(&body_bytes);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&plain)
            .and_then(|_| encoder.finish())
            .map(|compressed| binary::join(vec![token, compressed]))
            .map_err(|e| Error::Other(format!("failed to compress interchange body: {e}")))
    } else {
        Ok(binary::join(vec![token, body_bytes]))
    }
}
