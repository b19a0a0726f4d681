use crate::executor::CommandExecutor;
use crate::HostError;
use helmsman_config::ServiceTemplate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Unit file name for a managed service.
pub fn unit_name(service: &str) -> String {
    format!("{service}-backend.service")
}

/// Materializes a service offline and promotes it into the live root.
///
/// Provisioning happens against a staging tree (an overlay mount of the live
/// root): the image is pulled inside a chroot of the staging tree, the unit
/// file is rendered into its `etc/systemd/system`, and the overlay's upper
/// layer is then promoted onto the live root in one rsync pass. Until the
/// promote step nothing the live system reads has changed.
#[derive(Debug, Clone)]
pub struct Provisioner {
    staging_root: PathBuf,
    upper_dir: PathBuf,
    live_root: PathBuf,
}

impl Provisioner {
    pub fn new(
        staging_root: impl Into<PathBuf>,
        upper_dir: impl Into<PathBuf>,
        live_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            staging_root: staging_root.into(),
            upper_dir: upper_dir.into(),
            live_root: live_root.into(),
        }
    }

    /// Pull an image into the staging tree's container storage.
    pub fn pull_into_staging(
        &self,
        exec: &dyn CommandExecutor,
        image: &str,
    ) -> Result<(), HostError> {
        let root = self.staging_root.display().to_string();
        info!("pulling {image} into staging tree {root}");
        let resp = exec.run("chroot", &[&root, "podman", "pull", image]);
        if resp.ok {
            Ok(())
        } else {
            Err(HostError::ImagePull {
                image: image.to_owned(),
                detail: format!("{}: {}", resp.message, resp.output.trim()),
            })
        }
    }

    /// Render the service's unit file into the staging tree.
    pub fn write_unit(
        &self,
        template: &ServiceTemplate,
        service: &str,
        image: &str,
    ) -> Result<PathBuf, HostError> {
        let dir = self.staging_root.join("etc/systemd/system");
        let path = dir.join(unit_name(service));
        let rendered = template.render(service, image);
        let write = || -> std::io::Result<()> {
            fs::create_dir_all(&dir)?;
            fs::write(&path, rendered)
        };
        write().map_err(|e| HostError::UnitWrite {
            service: service.to_owned(),
            detail: e.to_string(),
        })?;
        debug!("wrote unit file {}", path.display());
        Ok(path)
    }

    /// Promote the overlay's upper layer onto the live root and clear it.
    ///
    /// The rsync pass preserves ACLs and xattrs so container storage survives
    /// the copy; the upper layer is emptied afterwards so the next overlay
    /// mount starts clean.
    pub fn promote(&self, exec: &dyn CommandExecutor) -> Result<(), HostError> {
        let source = format!("{}/", self.upper_dir.display());
        let target = format!("{}/", self.live_root.display());
        let resp = exec.run("rsync", &["-aAX", &source, &target]);
        if !resp.ok {
            return Err(HostError::Promote(format!(
                "{}: {}",
                resp.message,
                resp.output.trim()
            )));
        }
        for entry in fs::read_dir(&self.upper_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
        info!("promoted staging changes to {target}");
        Ok(())
    }

    /// Full offline provisioning pass for one service.
    pub fn provision(
        &self,
        exec: &dyn CommandExecutor,
        template: &ServiceTemplate,
        service: &str,
        image: &str,
    ) -> Result<(), HostError> {
        self.pull_into_staging(exec, image)?;
        self.write_unit(template, service, image)?;
        self.promote(exec)
    }
}
