//! Error types for osu-vault-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for osu-vault operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of buffer at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidString { offset: usize },

    #[error("failed to parse stable database: {0}")]
    StableParse(String),

    #[error("invalid version token: {0}")]
    InvalidVersionToken(String),

    #[error("invalid file footer, this collection might be corrupted")]
    CorruptedFooter,

    #[error("file not found at: {0}")]
    FileNotFound(PathBuf),

    #[error("one of the hashes from {collection} is invalid")]
    InvalidCollectionHash { collection: String },

    #[error("modern store error: {0}")]
    Store(String),

    #[error("failed to read/write ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("beatmap not found: {0}")]
    BeatmapNotFound(String),

    #[error("beatmapset not found: {0}")]
    BeatmapSetNotFound(i32),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a modern-store (redb/bincode) failure.
    pub(crate) fn store(err: impl std::fmt::Display) -> Self {
        Error::Store(err.to_string())
    }
}

/// Result type alias for osu-vault operations
pub type Result<T> = std::result::Result<T, Error>;
