//! Builder for legacy beatmap text files
//!
//! Produces a minimal `.osu` file (and optionally a packaged `.osz`) for
//! content imported from outside the game, e.g. a downloaded song. A
//! property holds either a plain value, serialized literally, or a path
//! value, serialized as its basename while the full location is kept for
//! packaging.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const FORMAT_HEADER: &str = "osu file format v14";

/// A property value: either serialized as-is, or a file location whose
/// basename goes into the text file.
#[derive(Debug, Clone)]
pub enum FileValue {
    Plain(String),
    Path(PathBuf),
}

impl FileValue {
    fn render(&self) -> String {
        match self {
            FileValue::Plain(value) => value.clone(),
            FileValue::Path(location) => location
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Keys that must be set before [`BeatmapFileBuilder::build`] succeeds.
const REQUIRED_KEYS: [&str; 3] = ["Title", "Artist", "AudioFilename"];

/// Section layout with default values, written in declaration order.
fn section_defaults() -> Vec<(&'static str, Vec<(&'static str, &'static str)>)> {
    vec![
        (
            "General",
            vec![
                ("AudioFilename", ""),
                ("SampleSet", "None"),
                ("AudioLeadIn", "0"),
                ("PreviewTime", "-1"),
                ("Countdown", "0"),
                ("StackLeniency", "0.7"),
                ("Mode", "0"),
                ("LetterboxInBreaks", "0"),
                ("WidescreenStoryboard", "0"),
            ],
        ),
        (
            "Editor",
            vec![
                ("DistanceSpacing", "2"),
                ("BeatDivisor", "4"),
                ("GridSize", "1"),
                ("TimelineZoom", "1"),
            ],
        ),
        (
            "Metadata",
            vec![
                ("Title", ""),
                ("TitleUnicode", ""),
                ("Artist", ""),
                ("ArtistUnicode", ""),
                ("Creator", "osu-vault"),
                ("Version", "hello, world!"),
                ("Source", ""),
                ("Tags", ""),
                ("BeatmapID", "0"),
                ("BeatmapSetID", "-1"),
            ],
        ),
        (
            "Difficulty",
            vec![
                ("HPDrainRate", "5"),
                ("CircleSize", "5"),
                ("OverallDifficulty", "5"),
                ("ApproachRate", "5"),
                ("SliderMultiplier", "1.4"),
                ("SliderTickRate", "1"),
            ],
        ),
    ]
}

/// Builder for one legacy beatmap file.
#[derive(Debug, Default)]
pub struct BeatmapFileBuilder {
    properties: BTreeMap<String, FileValue>,
    background: Option<PathBuf>,
}

impl BeatmapFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a plain property.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.properties
            .insert(key.to_string(), FileValue::Plain(value.into()));
        self
    }

    /// Set the audio file; the location must exist.
    pub fn set_audio(&mut self, location: &Path) -> Result<&mut Self> {
        if !location.exists() {
            return Err(Error::FileNotFound(location.to_path_buf()));
        }
        self.properties.insert(
            "AudioFilename".to_string(),
            FileValue::Path(location.to_path_buf()),
        );
        Ok(self)
    }

    /// Set the background image; the location must exist.
    pub fn set_image(&mut self, location: &Path) -> Result<&mut Self> {
        if !location.exists() {
            return Err(Error::FileNotFound(location.to_path_buf()));
        }
        self.background = Some(location.to_path_buf());
        Ok(self)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.properties.get(key).map(FileValue::render)
    }

    /// Render the `.osu` text content.
    pub fn build(&self) -> Result<String> {
        for key in REQUIRED_KEYS {
            if !self.properties.contains_key(key) {
                return Err(Error::Other(format!("builder: missing {key}")));
            }
        }

        let mut lines = vec![FORMAT_HEADER.to_string(), String::new()];

        for (section, defaults) in section_defaults() {
            lines.push(format!("[{section}]"));

            for (key, default) in defaults {
                // unicode fields fall back to their plain counterparts
                let value = match key {
                    "TitleUnicode" => self.get(key).or_else(|| self.get("Title")),
                    "ArtistUnicode" => self.get(key).or_else(|| self.get("Artist")),
                    _ => self.get(key),
                }
                .unwrap_or_else(|| default.to_string());

                lines.push(format!("{key}:{value}"));
            }

            lines.push(String::new());
        }

        lines.push("[Events]".to_string());
        match &self.background {
            Some(location) => {
                let name = FileValue::Path(location.clone()).render();
                lines.push(format!("0,0,\"{name}\""));
            }
            None => lines.push("// not specified".to_string()),
        }
        lines.push(String::new());

        Ok(lines.join("\n"))
    }

    /// Package the file and its referenced audio/background into an `.osz`
    /// archive at `dest`.
    pub fn package(&self, dest: &Path) -> Result<()> {
        let content = self.build()?;

        let Some(FileValue::Path(audio)) = self.properties.get("AudioFilename") else {
            return Err(Error::Other("builder: audio was not set from a file".to_string()));
        };
        if !audio.exists() {
            return Err(Error::FileNotFound(audio.clone()));
        }

        let output = File::create(dest)?;
        let mut zip = ZipWriter::new(output);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let title = self.get("Title").unwrap_or_else(|| "untitled".to_string());
        zip.start_file(format!("{title}.osu"), options)?;
        zip.write_all(content.as_bytes())?;

        zip.start_file(FileValue::Path(audio.clone()).render(), options)?;
        zip.write_all(&fs::read(audio)?)?;

        if let Some(background) = &self.background {
            if background.exists() {
                zip.start_file(FileValue::Path(background.clone()).render(), options)?;
                zip.write_all(&fs::read(background)?)?;
            }
        }

        zip.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_key() {
        let mut builder = BeatmapFileBuilder::new();
        builder.set("Title", "song");

        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("Artist"));
    }

    #[test]
    fn test_build_with_path_values() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("full song.mp3");
        fs::write(&audio, b"ID3").unwrap();

        let mut builder = BeatmapFileBuilder::new();
        builder.set("Title", "song").set("Artist", "artist");
        builder.set_audio(&audio).unwrap();

        let content = builder.build().unwrap();
        assert!(content.starts_with(FORMAT_HEADER));
        // path values serialize as their basename
        assert!(content.contains("AudioFilename:full song.mp3"));
        assert!(!content.contains(dir.path().to_str().unwrap()));
        assert!(content.contains("Title:song"));
        // unicode fields fall back to the plain fields
        assert!(content.contains("TitleUnicode:song"));
        assert!(content.contains("// not specified"));
    }

    #[test]
    fn test_background_event_line() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.mp3");
        let image = dir.path().join("bg.jpg");
        fs::write(&audio, b"ID3").unwrap();
        fs::write(&image, b"JFIF").unwrap();

        let mut builder = BeatmapFileBuilder::new();
        builder.set("Title", "t").set("Artist", "a");
        builder.set_audio(&audio).unwrap();
        builder.set_image(&image).unwrap();

        let content = builder.build().unwrap();
        assert!(content.contains("0,0,\"bg.jpg\""));
    }

    #[test]
    fn test_set_audio_requires_existing_file() {
        let mut builder = BeatmapFileBuilder::new();
        let err = builder.set_audio(Path::new("/nope/a.mp3")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_package_writes_archive() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.mp3");
        fs::write(&audio, b"ID3").unwrap();

        let mut builder = BeatmapFileBuilder::new();
        builder.set("Title", "packaged").set("Artist", "artist");
        builder.set_audio(&audio).unwrap();

        let dest = dir.path().join("out.osz");
        builder.package(&dest).unwrap();

        let archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut names: Vec<_> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["a.mp3", "packaged.osu"]);
    }
}
