//! Platform-specific path detection for game installations

use std::path::{Path, PathBuf};

/// Check if a path looks like a stable installation: a Songs folder plus at
/// least one of the signature database files.
fn is_stable_installation(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }

    if !path.join("Songs").is_dir() {
        return false;
    }

    path.join("osu!.db").exists()
        || path.join("collection.db").exists()
        || path.join("scores.db").exists()
}

/// Check if a path looks like a modern data directory: the store file plus
/// the content-addressed files tree.
fn is_modern_installation(path: &Path) -> bool {
    path.is_dir() && path.join("client.db").exists()
}

/// Detect a stable installation directory in the usual places.
pub fn detect_stable_path() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(local) = dirs::data_local_dir() {
        candidates.push(local.join("osu!"));
    }

    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".wine/drive_c/osu!"));
        candidates.push(home.join(".local/share/osu-wine/osu!"));
        candidates.push(home.join("Games/osu!"));
    }

    candidates.into_iter().find(|path| is_stable_installation(path))
}

/// Detect a modern data directory in the usual places.
pub fn detect_modern_path() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(data) = dirs::data_dir() {
        candidates.push(data.join("osu"));
        candidates.push(data.join("osu-vault"));
    }
    if let Some(local) = dirs::data_local_dir() {
        candidates.push(local.join("osu"));
        candidates.push(local.join("osu-vault"));
    }

    candidates.into_iter().find(|path| is_modern_installation(path))
}

/// Validate that a path is a usable stable installation.
pub fn validate_stable_path(path: &Path) -> bool {
    path.exists() && path.join("Songs").is_dir()
}

/// Validate that a path is a usable modern data directory.
pub fn validate_modern_path(path: &Path) -> bool {
    path.exists() && path.join("client.db").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_does_not_panic() {
        let _ = detect_stable_path();
        let _ = detect_modern_path();
    }

    #[test]
    fn test_validate_modern_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!validate_modern_path(dir.path()));

        std::fs::write(dir.path().join("client.db"), b"").unwrap();
        assert!(validate_modern_path(dir.path()));
    }

    #[test]
    fn test_validate_stable_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!validate_stable_path(dir.path()));

        std::fs::create_dir(dir.path().join("Songs")).unwrap();
        assert!(validate_stable_path(dir.path()));
    }
}
