//! Lifecycle management for stored memories: decay, drift and
//! reconfirmation.
//!
//! This crate is pure calculation. `MemoryLifecycle::process_memories`
//! takes item snapshots and returns a report; the caller (an application
//! scheduler or the CLI `maintain` command) decides when to run a pass and
//! applies the resulting updates through the engine. Nothing in here
//! touches the store or the index.
//!
//! - Decay: salience halves every configured half-life of disuse, with a
//!   stretched half-life for high-salience items and a hard floor
//! - Drift: items that decayed or sat unused too long get a `DriftReport`
//!   with a recommended action
//! - Reconfirmation: drift findings that need user input queue up as
//!   `ReconfirmationItem`s until cleared

mod decay;
mod drift;
mod process;

pub use decay::{calculate_decay, estimate_decay_preview, recommended_status, DecayPoint};
pub use drift::{detect_drift, DriftAction, DriftReport};
pub use process::{
    DecayUpdate, LifecycleReport, LifecycleSummary, MemoryLifecycle, ReconfirmationItem,
};
