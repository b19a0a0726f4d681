use crate::executor::CommandExecutor;
use crate::HostError;
use std::path::Path;
use tracing::debug;

/// Block device backing the live root filesystem.
///
/// `findmnt` reports btrfs sources as `/dev/sda2[/@]`; the bracketed subvolume
/// suffix is stripped so the device can be remounted at its top level.
pub fn root_device(exec: &dyn CommandExecutor) -> Option<String> {
    let resp = exec.run("findmnt", &["-n", "-o", "SOURCE", "/"]);
    if !resp.ok {
        return None;
    }
    let source = resp.output.trim();
    if source.is_empty() {
        return None;
    }
    let device = source.split('[').next().unwrap_or(source);
    Some(device.to_owned())
}

/// Mount the filesystem's top level (subvolid 5) at the given target.
pub fn mount_disk(
    exec: &dyn CommandExecutor,
    device: &str,
    target: &Path,
) -> Result<(), HostError> {
    let target_str = target.display().to_string();
    debug!("mounting {device} at {target_str}");
    let resp = exec.run("mount", &["-o", "subvolid=5", device, &target_str]);
    if resp.ok {
        Ok(())
    } else {
        Err(HostError::Mount {
            device: device.to_owned(),
            target: target_str,
            detail: format!("{}: {}", resp.message, resp.output.trim()),
        })
    }
}

/// Unmount the given target.
pub fn unmount(exec: &dyn CommandExecutor, target: &Path) -> Result<(), HostError> {
    let target_str = target.display().to_string();
    debug!("unmounting {target_str}");
    let resp = exec.run("umount", &[target_str.as_str()]);
    if resp.ok {
        Ok(())
    } else {
        Err(HostError::Unmount {
            target: target_str,
            detail: format!("{}: {}", resp.message, resp.output.trim()),
        })
    }
}
