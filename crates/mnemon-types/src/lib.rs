//! # mnemon-types
//!
//! Shared domain types for the mnemon memory engine.
//!
//! This crate defines the structures used throughout the workspace:
//! - `MemoryItem`: the unit of long-term storage, with kind/status/source enums
//! - `Settings`: layered configuration for every component
//! - `MemoryError`: the unified error type
//!
//! ## Usage
//!
//! ```rust
//! use mnemon_types::{MemoryItem, MemoryKind};
//! ```

pub mod config;
pub mod error;
pub mod item;

pub use config::{DecayConfig, PolicyConfig, Settings, WorkingMemoryConfig};
pub use error::MemoryError;
pub use item::{
    MemoryItem, MemoryKind, MemorySource, MemoryStatus, TraceMap, SALIENCE_FLOOR,
};
