//! Data model for beatmap collections
//!
//! A collection is a named, ordered list of beatmap content hashes. Hashes
//! may reference beatmaps that are not present locally; such dangling
//! references are valid and kept as-is.

use serde::{Deserialize, Serialize};

/// A beatmap collection: a name plus an ordered list of MD5 content hashes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    /// Name of the collection, unique within a backend instance.
    pub name: String,
    /// MD5 hashes of beatmaps in this collection. Duplicates are allowed in
    /// storage; uniqueness is a query-time concern.
    pub beatmaps: Vec<String>,
}

impl Collection {
    /// Create a new empty collection with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            beatmaps: Vec::new(),
        }
    }

    /// Create a new collection with the given name and hashes.
    pub fn with_hashes(name: impl Into<String>, hashes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            beatmaps: hashes,
        }
    }

    /// Number of beatmap references in this collection.
    pub fn len(&self) -> usize {
        self.beatmaps.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.beatmaps.is_empty()
    }

    /// Append hashes that are not already present, preserving order.
    pub fn merge_hashes(&mut self, hashes: &[String]) {
        for hash in hashes {
            if !self.beatmaps.contains(hash) {
                self.beatmaps.push(hash.clone());
            }
        }
    }
}
