//! In-memory inverted index for the mnemon memory engine.
//!
//! Provides:
//! - `MemoryIndex`: multi-key index (id, kind, tag, module, status) owning
//!   a canonical copy of every indexed item
//! - `MemoryQuery`: filter set for lookups, combined by intersection
//! - `IndexStats`: aggregate counts for health reporting
//!
//! The index is a pure lookup structure. It is rebuilt from the
//! authoritative store at startup and never consulted as a source of
//! durable truth.

pub mod index;
pub mod query;

pub use index::{IndexStats, MemoryIndex};
pub use query::MemoryQuery;
