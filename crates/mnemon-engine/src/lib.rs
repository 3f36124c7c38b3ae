//! Coordinating engine for the mnemon memory system.
//!
//! [`MemoryEngine`] wires the three lower layers together and is the only
//! type callers talk to:
//!
//! - [`mnemon_store::LongTermMemory`]: durable items and the id sequence
//! - [`mnemon_index::MemoryIndex`]: in-memory filter index, rebuilt at open
//! - [`WorkingMemory`]: volatile per-session scratchpad, never persisted
//!
//! Mutations go to the store first and reach the index only after the write
//! succeeded, so a failed persist never leaves the index pointing at state
//! that does not exist on disk. Optional [`StorePolicy`] / [`RecallPolicy`]
//! objects hook the write and read paths.

mod engine;
mod hooks;
mod requests;
mod working;

pub use engine::MemoryEngine;
pub use hooks::{PolicyVerdict, RecallPolicy, StoreMeta, StorePolicy};
pub use requests::{ForgetFilter, MemoryHealth, RecallRequest, StoreRequest};
pub use working::WorkingMemory;
