use crate::layout::SnapshotLayout;
use crate::manager::Snapshot;
use helmsman_config::file_fingerprint;
use std::path::Path;
use tracing::{debug, warn};

/// Whether the declared configuration differs from the copy frozen in the
/// given snapshot.
///
/// Fail-open: when either file cannot be fingerprinted the configuration is
/// reported as changed, so a damaged or missing snapshot copy triggers a
/// reconciliation pass instead of suppressing one.
pub fn configuration_changed(
    layout: &SnapshotLayout,
    live_config: &Path,
    snapshot: &Snapshot,
) -> bool {
    let frozen = layout.snapshot_config(&snapshot.path);
    let live = match file_fingerprint(live_config) {
        Ok(fp) => fp,
        Err(e) => {
            warn!(
                "cannot fingerprint {}: {e}; treating configuration as changed",
                live_config.display()
            );
            return true;
        }
    };
    let snapshot_fp = match file_fingerprint(&frozen) {
        Ok(fp) => fp,
        Err(e) => {
            warn!(
                "cannot fingerprint {}: {e}; treating configuration as changed",
                frozen.display()
            );
            return true;
        }
    };
    let changed = live != snapshot_fp;
    debug!(
        "configuration {} since snapshot {}",
        if changed { "changed" } else { "unchanged" },
        snapshot.id
    );
    changed
}
