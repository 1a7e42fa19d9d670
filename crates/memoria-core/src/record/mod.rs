//! Records, snapshots and partial updates.
//!
//! Stores deal in raw JSON; the binding decodes snapshots into typed
//! [`Record`]s and encodes [`FieldPatch`]es for partial updates.

mod patch;
pub mod tree;
mod types;

pub use patch::{FieldPatch, FieldUpdate};
pub use types::{Record, Snapshot};
