//! Export of beatmapsets and collections to new files on disk
//!
//! Sets are packaged as `.osz` zip archives; collections are exported
//! either in the stable list format or the interchange format.

use crate::beatmap::Beatmap;
use crate::collection::Collection;
use crate::config::Config;
use crate::driver::BeatmapFile;
use crate::error::{Error, Result};
use crate::interchange::{
    self, InterchangeBeatmap, InterchangeCollection, InterchangeFile, InterchangeVersion,
};
use crate::stable;
use crate::utils::sanitize_filename;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Target format for a collection export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// The stable `collection.db` layout.
    Stable,
    /// The third-party interchange format (written at its newest minimal
    /// version).
    Interchange,
}

fn export_dir(config: &Config) -> Result<PathBuf> {
    let dir = config
        .export_path
        .clone()
        .ok_or_else(|| Error::Config("export path not configured".to_string()))?;
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Write files into an `.osz` zip archive.
///
/// A missing `.osu` file aborts the export; any other missing file is
/// tolerated with a warning. Duplicate names keep the first occurrence.
pub fn write_osz(files: &[BeatmapFile], dest: &Path) -> Result<()> {
    let output = File::create(dest)?;
    let mut zip = ZipWriter::new(output);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut seen: HashSet<&str> = HashSet::new();

    for file in files {
        if file.location.is_dir() {
            warn!(location = %file.location.display(), "skipping directory");
            continue;
        }

        if !file.location.exists() {
            // a set without its .osu files is not importable anywhere
            if file.name.ends_with(".osu") {
                return Err(Error::FileNotFound(file.location.clone()));
            }
            warn!(location = %file.location.display(), "skipping missing file");
            continue;
        }

        if !seen.insert(file.name.as_str()) {
            continue;
        }

        let content = fs::read(&file.location)?;
        zip.start_file(file.name.as_str(), options)?;
        zip.write_all(&content)?;
    }

    zip.finish()?;
    Ok(())
}

/// Export one set's files as `{id}.osz` under the export directory.
pub fn export_beatmapset(config: &Config, id: i32, files: &[BeatmapFile]) -> Result<PathBuf> {
    if files.is_empty() {
        return Err(Error::BeatmapSetNotFound(id));
    }

    let dest = export_dir(config)?.join(format!("{id}.osz"));
    write_osz(files, &dest)?;

    info!(id, dest = %dest.display(), "exported beatmapset");
    Ok(dest)
}

fn to_interchange(
    collections: &[Collection],
    editor: &str,
    lookup: impl Fn(&str) -> Option<Beatmap>,
) -> InterchangeFile {
    let mut out = Vec::with_capacity(collections.len());

    for collection in collections {
        let mut entry = InterchangeCollection {
            name: collection.name.clone(),
            online_id: None,
            beatmaps: Vec::new(),
            // the hash-only hint list carries every reference, resolved or not
            hash_only: collection.beatmaps.clone(),
        };

        for hash in &collection.beatmaps {
            let Some(beatmap) = lookup(hash) else {
                continue;
            };

            entry.beatmaps.push(InterchangeBeatmap {
                difficulty_id: beatmap.online_id,
                beatmapset_id: beatmap.beatmapset_id,
                artist: Some(beatmap.artist),
                title: Some(beatmap.title),
                difficulty: Some(beatmap.difficulty),
                md5: beatmap.md5,
                comment: None,
                mode: Some(beatmap.mode as u8),
                star_rating: Some(beatmap.star_rating),
            });
        }

        out.push(entry);
    }

    InterchangeFile {
        version: InterchangeVersion::V8Min,
        save_date: chrono::Utc::now().timestamp_millis(),
        last_editor: editor.to_string(),
        collections: out,
    }
}

/// Export collections to a new file under the export directory. The file is
/// named by joining the collection names.
pub fn export_collections(
    config: &Config,
    collections: &[Collection],
    format: ExportFormat,
    editor: &str,
    lookup: impl Fn(&str) -> Option<Beatmap>,
) -> Result<PathBuf> {
    if collections.is_empty() {
        return Err(Error::Other("no collections to export".to_string()));
    }

    let joined = collections
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join("-");
    let stem = sanitize_filename(&joined);

    let (file_name, buf) = match format {
        ExportFormat::Stable => (format!("{stem}.db"), stable::write_collections(collections)?),
        ExportFormat::Interchange => {
            let file = to_interchange(collections, editor, lookup);
            (
                format!("{stem}.osdb"),
                interchange::write(file.version, &file)?,
            )
        }
    };

    let dest = export_dir(config)?.join(file_name);
    fs::write(&dest, buf)?;

    info!(collections = collections.len(), dest = %dest.display(), "exported collections");
    Ok(dest)
}
