use crate::manager::{Snapshot, SnapshotManager};
use crate::SnapshotError;
use helmsman_host::CommandExecutor;
use tracing::{info, warn};

/// Result of a rollback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// The previous snapshot is now the live subvolume.
    RolledBack {
        /// The snapshot installed as the live subvolume.
        restored: Snapshot,
        /// Id of the snapshot that was discarded.
        discarded: String,
    },
    /// Fewer than two snapshots exist; nothing was touched.
    NothingToRollBack,
}

/// Swap the live subvolume for the previous snapshot.
///
/// With zero or one snapshots this is a no-op, not an error. Otherwise the
/// current snapshot is discarded first (it mirrors the state being rolled
/// back), then the live subvolume is parked at the staging path and the
/// previous snapshot moved into its place. If that final move fails the
/// parked subvolume is moved back, so the host never loses its root: either
/// the swap completes or the live subvolume is exactly where it started.
///
/// The caller reboots afterwards; this function only rearranges subvolumes.
pub fn rollback(
    exec: &dyn CommandExecutor,
    manager: &SnapshotManager,
) -> Result<RollbackOutcome, SnapshotError> {
    let mut snapshots = manager.list()?;
    if snapshots.len() < 2 {
        info!("nothing to roll back to");
        return Ok(RollbackOutcome::NothingToRollBack);
    }
    let current = snapshots.pop().ok_or(SnapshotError::NoPrevious)?;
    let previous = snapshots.pop().ok_or(SnapshotError::NoPrevious)?;
    info!(
        "rolling back: discarding {}, restoring {}",
        current.id, previous.id
    );

    manager.delete(exec, &current)?;

    let layout = manager.layout();
    let tmp = layout.swap_tmp().display().to_string();
    let live = layout.live_subvol().display().to_string();
    let prev = previous.path.display().to_string();

    // Clear any staging leftover from an interrupted earlier rollback.
    let resp = exec.run("rm", &["-rf", &tmp]);
    if !resp.ok {
        return Err(SnapshotError::Swap(format!(
            "clearing staging path {tmp}: {}",
            resp.message
        )));
    }

    // An interrupted earlier attempt may already have moved the live
    // subvolume away; in that case there is nothing to park and the restore
    // must still go through.
    let parked = if layout.live_subvol().exists() {
        let resp = exec.run("mv", &[live.as_str(), tmp.as_str()]);
        if !resp.ok {
            return Err(SnapshotError::Swap(format!(
                "parking live subvolume at {tmp}: {}",
                resp.message
            )));
        }
        true
    } else {
        warn!("live subvolume {live} is absent, resuming an interrupted rollback");
        false
    };

    let resp = exec.run("mv", &[prev.as_str(), live.as_str()]);
    if !resp.ok {
        if parked {
            let back = exec.run("mv", &[tmp.as_str(), live.as_str()]);
            if back.ok {
                warn!("restore of {} failed, live subvolume put back", previous.id);
            } else {
                warn!(
                    "restore of {} failed and the live subvolume could not be put back: {}",
                    previous.id, back.message
                );
            }
        } else {
            warn!("restore of {} failed, no parked subvolume to put back", previous.id);
        }
        return Err(SnapshotError::Swap(format!(
            "installing {} as live subvolume: {}",
            previous.id, resp.message
        )));
    }

    info!("restored {}", previous.id);
    Ok(RollbackOutcome::RolledBack {
        restored: Snapshot {
            id: previous.id,
            path: layout.live_subvol(),
        },
        discarded: current.id,
    })
}

/// Reboot the host after a short delay so log output reaches the journal.
pub fn reboot(exec: &dyn CommandExecutor) {
    std::thread::sleep(std::time::Duration::from_secs(1));
    let resp = exec.run("reboot", &[]);
    if !resp.ok {
        warn!("reboot request failed: {}", resp.message);
    }
}
