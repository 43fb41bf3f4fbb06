//! osu!stable database and collection file codecs
//!
//! The stable generation stores everything in two flat binary files:
//! `osu!.db` (the beatmap database) and `collection.db` (the collection
//! list). Both use the primitives from [`crate::binary`]; every layout rule
//! that changed across format versions is gated on the version integer at
//! the head of the file.

mod collections;
mod database;

pub use collections::*;
pub use database::*;
