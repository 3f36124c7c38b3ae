//! Durable JSON persistence for the mnemon memory engine.
//!
//! Provides:
//! - `LongTermMemory`: the authoritative store, one JSON file per memory
//!   kind plus a metadata file, fully rewritten on every mutation
//! - `MemorySnapshot`: export/import state transfer
//! - Atomic file replacement (temp file, fsync, rename) so a crash never
//!   leaves a half-written file behind
//! - Lenient loading: corrupt records are skipped with a warning, the rest
//!   of the file still loads
//!
//! A legacy single-file layout (`memory.json` at the data dir root) is
//! migrated into the per-kind layout the first time it is seen.

mod error;
mod files;
mod snapshot;
mod store;

pub use error::StoreError;
pub use snapshot::MemorySnapshot;
pub use store::{LongTermMemory, STORE_FORMAT_VERSION};
