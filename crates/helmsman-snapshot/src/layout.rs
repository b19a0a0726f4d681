use std::fs;
use std::path::{Path, PathBuf};

/// Name prefix for system snapshots.
pub const SNAPSHOT_PREFIX: &str = "system_";

/// Path of the declared configuration inside a root tree, relative to the
/// tree's top. The same relative path resolves the live file and the copy
/// frozen inside each snapshot.
pub const CONFIG_REL_PATH: &str = "etc/helmsman/services.conf";

/// Directory layout of the mounted btrfs top level.
///
/// `root` is the mount point of subvolid 5 (conventionally `/mnt`); the live
/// system subvolume, the snapshot directory, and the rollback staging path
/// all hang off it.
#[derive(Debug, Clone)]
pub struct SnapshotLayout {
    root: PathBuf,
}

impl SnapshotLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    /// The live system subvolume.
    #[inline]
    pub fn live_subvol(&self) -> PathBuf {
        self.root.join("@")
    }

    /// Where the displaced live subvolume is parked during a rollback swap.
    #[inline]
    pub fn swap_tmp(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// The declared configuration frozen inside the given snapshot.
    pub fn snapshot_config(&self, snapshot_path: &Path) -> PathBuf {
        snapshot_path.join(CONFIG_REL_PATH)
    }

    pub fn initialize(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.snapshots_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_root() {
        let layout = SnapshotLayout::new("/mnt");
        assert_eq!(layout.snapshots_dir(), PathBuf::from("/mnt/snapshots"));
        assert_eq!(layout.live_subvol(), PathBuf::from("/mnt/@"));
        assert_eq!(layout.swap_tmp(), PathBuf::from("/mnt/tmp"));
    }

    #[test]
    fn snapshot_config_uses_embedded_relative_path() {
        let layout = SnapshotLayout::new("/mnt");
        assert_eq!(
            layout.snapshot_config(&PathBuf::from("/mnt/snapshots/system_20260823120000")),
            PathBuf::from("/mnt/snapshots/system_20260823120000/etc/helmsman/services.conf")
        );
    }

    #[test]
    fn initialize_creates_snapshots_dir() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SnapshotLayout::new(dir.path());
        layout.initialize().unwrap();
        assert!(layout.snapshots_dir().is_dir());
    }
}
