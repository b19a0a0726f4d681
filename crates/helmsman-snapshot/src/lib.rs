//! Snapshot lifecycle for the Helmsman appliance root.
//!
//! The live system is a btrfs subvolume (`@`) whose siblings under
//! `snapshots/` are point-in-time copies named so that lexicographic order is
//! chronological order. This crate owns the snapshot naming and listing rules,
//! drift detection against the newest snapshot's embedded configuration, and
//! the compensated subvolume swap that implements rollback.

pub mod drift;
pub mod layout;
pub mod manager;
pub mod rollback;

pub use drift::configuration_changed;
pub use layout::{SnapshotLayout, CONFIG_REL_PATH, SNAPSHOT_PREFIX};
pub use manager::{Snapshot, SnapshotManager};
pub use rollback::{reboot, rollback, RollbackOutcome};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no snapshots exist under {0}")]
    NoSnapshots(String),
    #[error("no previous snapshot to roll back to")]
    NoPrevious,
    #[error("error creating snapshot {id}: {detail}")]
    Create { id: String, detail: String },
    #[error("error deleting snapshot {id}: {detail}")]
    Delete { id: String, detail: String },
    #[error("error swapping root subvolume: {0}")]
    Swap(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
