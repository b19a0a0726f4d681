//! Configuration store for Helmsman.
//!
//! This crate owns everything that is read once and treated as immutable for
//! the rest of a run: the user's declared service configuration
//! (`service.<name>.enable = true|false` lines), the bundled registry of
//! service templates and built-in defaults, and the blake3 content
//! fingerprint used by drift detection.

pub mod declaration;
pub mod fingerprint;
pub mod registry;

pub use declaration::{parse_declarations, read_declarations, ServiceDeclaration};
pub use fingerprint::file_fingerprint;
pub use registry::{DeploymentProfile, ServiceRegistry, ServiceTemplate};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration line: {0}")]
    InvalidLine(String),
    #[error("invalid configuration key: {0}")]
    InvalidKey(String),
    #[error("registry document error: {0}")]
    Registry(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
