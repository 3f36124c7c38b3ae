//! Store and recall policy for the mnemon engine.
//!
//! [`MemoryPolicy`] implements both of the engine's hook traits:
//!
//! - on the store path it validates payload bounds, normalizes tags,
//!   computes the final salience from source and kind, and stamps
//!   provenance into the item's trace
//! - on the recall path it filters and annotates results according to the
//!   current [`OperatingMode`]
//!
//! One instance is wired into the engine at startup; the mode can be
//! switched at runtime through a shared reference.

mod mode;
mod policy;

pub use mode::{ModeFilter, OperatingMode};
pub use policy::{MemoryPolicy, POLICY_VERSION};
