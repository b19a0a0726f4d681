//! Reconciliation engine for Helmsman.
//!
//! Ties the pieces together: reads the declared configuration, decides per
//! service what the host needs (enable, disable, provision first), applies
//! those decisions through the host layer, and seals successful passes with a
//! snapshot. Also drives image updates and rollback.

pub mod concurrency;
pub mod decision;
pub mod engine;

pub use concurrency::RunLock;
pub use decision::{decide, ReconcileDecision, ServiceFacts};
pub use engine::{Engine, ReconcileReport, ServiceOutcome, UpdateReport};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] helmsman_config::ConfigError),
    #[error(transparent)]
    Host(#[from] helmsman_host::HostError),
    #[error(transparent)]
    Snapshot(#[from] helmsman_snapshot::SnapshotError),
    #[error("another run holds the lock at {0}")]
    Busy(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
