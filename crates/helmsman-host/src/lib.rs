//! Host integration for Helmsman.
//!
//! This crate implements the execution layer: the narrow `CommandExecutor`
//! capability every other component is parameterized over (with a real host
//! implementation and a scripted mock), the systemd service controller, podman
//! image operations, the offline-staging service provisioner, and the thin
//! mount/login collaborators.

pub mod executor;
pub mod image;
pub mod mock;
pub mod mount;
pub mod provision;
pub mod systemd;

pub use executor::{CommandExecutor, CommandOutput, HostExecutor};
pub use image::ImageSource;
pub use mock::MockExecutor;
pub use provision::{unit_name, Provisioner};
pub use systemd::UnitState;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("unit {0} does not exist; create the unit file first")]
    UnitNotFound(String),
    #[error("error {operation} {unit}: {detail}")]
    UnitOperation {
        operation: &'static str,
        unit: String,
        detail: String,
    },
    #[error("error pulling image {image}: {detail}")]
    ImagePull { image: String, detail: String },
    #[error("error inspecting remote image {image}: {detail}")]
    RemoteInspect { image: String, detail: String },
    #[error("failed to write unit file for {service}: {detail}")]
    UnitWrite { service: String, detail: String },
    #[error("error promoting staging tree to live root: {0}")]
    Promote(String),
    #[error("error mounting {device} at {target}: {detail}")]
    Mount {
        device: String,
        target: String,
        detail: String,
    },
    #[error("error unmounting {target}: {detail}")]
    Unmount { target: String, detail: String },
    #[error("registry login failed: {0}")]
    Login(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
