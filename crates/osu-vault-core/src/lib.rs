//! # osu-vault-core
//!
//! Core library for managing a local osu! client's metadata across two
//! incompatible storage generations, plus the third-party interchange
//! format used to trade curated collections between users.
//!
//! This crate provides:
//! - Binary codecs for the stable database (`osu!.db`), its companion
//!   collection file (`collection.db`), and the `.osdb` interchange format,
//!   including every version-gated layout rule
//! - A driver abstraction that normalizes both backends into one canonical
//!   in-memory model with identical CRUD, search and export operations
//! - A query/filter/sort engine shared by both drivers
//!
//! ## Modules
//!
//! - [`beatmap`] - Canonical beatmap/beatmapset records and status codes
//! - [`binary`] - Offset-tracked binary cursor and writers
//! - [`builder`] - Legacy beatmap text-file builder
//! - [`collection`] - Collection (named hash list) model
//! - [`config`] - Configuration and installation path detection
//! - [`driver`] - The backend-agnostic driver trait and both backends
//! - [`enrich`] - Boundary to the external enrichment collaborator
//! - [`exporter`] - `.osz` and collection file export
//! - [`filter`] - Query grammar, filters and sorting
//! - [`interchange`] - `.osdb` interchange codec
//! - [`modern`] - Embedded object store and content-addressed file store
//! - [`stable`] - Stable database and collection file codecs
//!
//! ## Example
//!
//! ```no_run
//! use osu_vault_core::{create_driver, BeatmapFilter, Config, Driver};
//!
//! let config = Config::load();
//! let mut driver = create_driver(&config);
//! driver.initialize(false).expect("scan failed");
//!
//! let results = driver.search_beatmaps(&BeatmapFilter {
//!     query: Some("artist=\"glass beach\" ar>9".to_string()),
//!     ..Default::default()
//! });
//! println!("{} matches", results.beatmaps.len());
//! ```

pub mod beatmap;
pub mod binary;
pub mod builder;
pub mod collection;
pub mod config;
pub mod driver;
pub mod enrich;
pub mod error;
pub mod exporter;
pub mod filter;
pub mod interchange;
pub mod modern;
pub mod stable;
pub mod utils;

// Error types
pub use error::{Error, Result};

// Canonical model
pub use beatmap::{Beatmap, BeatmapSet, BeatmapSetMetadata, GameMode, Status, TimingPoint};

// Beatmap file builder
pub use builder::{BeatmapFileBuilder, FileValue};

// Collections
pub use collection::Collection;

// Configuration
pub use config::{
    detect_modern_path, detect_stable_path, validate_modern_path, validate_stable_path,
    BackendKind, Config,
};

// Drivers
pub use driver::{
    create_driver, BeatmapFile, Driver, DriverState, FetchResult, ModernDriver, SearchResponse,
    SetFetchResult, SetSearchResponse, StableDriver,
};

// Enrichment boundary
pub use enrich::{EnrichedData, Enricher, NoopEnricher};

// Export
pub use exporter::ExportFormat;

// Query engine
pub use filter::{BeatmapFilter, BeatmapSetFilter, MAX_STAR_RATING};

// Codecs
pub use interchange::{InterchangeFile, InterchangeVersion};
pub use modern::{FileStore, ModernStore};
pub use stable::{StableDatabase, COLLECTION_DB_VERSION};
