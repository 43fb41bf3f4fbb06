//! Configuration and path detection
//!
//! Backend selection and root directories are an explicit value passed into
//! driver construction, so multiple drivers (including fixture-backed ones
//! in tests) can coexist without shared globals.

mod paths;

pub use paths::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which storage generation a driver should open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// The flat binary database files.
    #[default]
    Stable,
    /// The embedded object store.
    Modern,
}

/// Configuration for osu-vault drivers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active backend.
    pub backend: BackendKind,
    /// Root of the stable installation (contains `osu!.db`).
    pub stable_path: Option<PathBuf>,
    /// Stable songs directory; defaults to `Songs` under `stable_path`.
    pub stable_songs_path: Option<PathBuf>,
    /// Root of the modern backend's data directory.
    pub modern_path: Option<PathBuf>,
    /// Where exports are written.
    pub export_path: Option<PathBuf>,
}

impl Config {
    /// Create a config with auto-detected installation paths.
    pub fn auto_detect() -> Self {
        Self {
            backend: BackendKind::default(),
            stable_path: detect_stable_path(),
            stable_songs_path: None,
            modern_path: detect_modern_path(),
            export_path: None,
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("osu-vault").join("config.json"))
    }

    /// Load config from disk, falling back to auto-detection if not found.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| std::fs::read_to_string(&path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_else(Self::auto_detect)
    }

    /// Save config to disk.
    pub fn save(&self) -> std::io::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = serde_json::to_string_pretty(self)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            std::fs::write(&path, content)?;
        }
        Ok(())
    }

    /// The stable songs directory, explicit or derived.
    pub fn songs_path(&self) -> Option<PathBuf> {
        self.stable_songs_path
            .clone()
            .or_else(|| self.stable_path.as_ref().map(|p| p.join("Songs")))
    }
}
