//! Modern backend storage
//!
//! The modern generation keeps metadata in an embedded, schema'd,
//! transactional object store ([`store`]) and beatmap content in a
//! content-addressed file store ([`file_store`]) laid out as
//! `files/<hash[0]>/<hash[0..2]>/<hash>`.

mod file_store;
mod store;

pub use file_store::*;
pub use store::*;
