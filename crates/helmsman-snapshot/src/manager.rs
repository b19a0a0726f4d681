use crate::layout::{SnapshotLayout, SNAPSHOT_PREFIX};
use crate::SnapshotError;
use chrono::Utc;
use helmsman_host::CommandExecutor;
use std::path::PathBuf;
use tracing::info;

/// One snapshot of the live system subvolume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: String,
    pub path: PathBuf,
}

/// Lists, creates, and deletes system snapshots.
///
/// Snapshot ids are `system_` followed by a UTC `YYYYMMDDHHMMSS` stamp, so
/// sorting ids lexicographically sorts snapshots chronologically; "current"
/// is always the lexicographic maximum.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    layout: SnapshotLayout,
}

impl SnapshotManager {
    pub fn new(layout: SnapshotLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &SnapshotLayout {
        &self.layout
    }

    /// All snapshots, oldest first.
    pub fn list(&self) -> Result<Vec<Snapshot>, SnapshotError> {
        let dir = self.layout.snapshots_dir();
        let mut snapshots = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(SNAPSHOT_PREFIX) && entry.file_type()?.is_dir() {
                snapshots.push(Snapshot {
                    id: name.to_owned(),
                    path: entry.path(),
                });
            }
        }
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(snapshots)
    }

    /// The newest snapshot.
    pub fn current(&self) -> Result<Snapshot, SnapshotError> {
        self.list()?.pop().ok_or_else(|| {
            SnapshotError::NoSnapshots(self.layout.snapshots_dir().display().to_string())
        })
    }

    /// The second-newest snapshot, the rollback target.
    pub fn previous(&self) -> Result<Snapshot, SnapshotError> {
        let mut snapshots = self.list()?;
        if snapshots.is_empty() {
            return Err(SnapshotError::NoSnapshots(
                self.layout.snapshots_dir().display().to_string(),
            ));
        }
        snapshots.pop();
        snapshots.pop().ok_or(SnapshotError::NoPrevious)
    }

    /// Snapshot the live subvolume under a freshly stamped id.
    pub fn create(&self, exec: &dyn CommandExecutor) -> Result<Snapshot, SnapshotError> {
        let id = format!("{SNAPSHOT_PREFIX}{}", Utc::now().format("%Y%m%d%H%M%S"));
        self.create_named(exec, &id)
    }

    /// Snapshot the live subvolume under an explicit id.
    pub fn create_named(
        &self,
        exec: &dyn CommandExecutor,
        id: &str,
    ) -> Result<Snapshot, SnapshotError> {
        let path = self.layout.snapshots_dir().join(id);
        let live = self.layout.live_subvol().display().to_string();
        let dest = path.display().to_string();
        let resp = exec.run("btrfs", &["subvolume", "snapshot", &live, &dest]);
        if !resp.ok {
            return Err(SnapshotError::Create {
                id: id.to_owned(),
                detail: format!("{}: {}", resp.message, resp.output.trim()),
            });
        }
        info!("created snapshot {id}");
        Ok(Snapshot {
            id: id.to_owned(),
            path,
        })
    }

    /// Delete a snapshot's subvolume.
    pub fn delete(
        &self,
        exec: &dyn CommandExecutor,
        snapshot: &Snapshot,
    ) -> Result<(), SnapshotError> {
        let path = snapshot.path.display().to_string();
        let resp = exec.run("btrfs", &["subvolume", "delete", &path]);
        if !resp.ok {
            return Err(SnapshotError::Delete {
                id: snapshot.id.clone(),
                detail: format!("{}: {}", resp.message, resp.output.trim()),
            });
        }
        info!("deleted snapshot {}", snapshot.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helmsman_host::{CommandOutput, MockExecutor};
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> SnapshotManager {
        let layout = SnapshotLayout::new(dir.path());
        layout.initialize().unwrap();
        SnapshotManager::new(layout)
    }

    fn seed(dir: &TempDir, ids: &[&str]) {
        for id in ids {
            std::fs::create_dir(dir.path().join("snapshots").join(id)).unwrap();
        }
    }

    #[test]
    fn list_sorts_ids_lexicographically() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        seed(&dir, &["system_20260823120000", "system_20250101000000"]);
        let ids: Vec<_> = manager.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["system_20250101000000", "system_20260823120000"]);
    }

    #[test]
    fn list_ignores_foreign_entries() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        seed(&dir, &["system_20250101000000"]);
        std::fs::create_dir(dir.path().join("snapshots/scratch")).unwrap();
        std::fs::write(dir.path().join("snapshots/system_stray"), "").unwrap();
        assert_eq!(manager.list().unwrap().len(), 1);
    }

    #[test]
    fn current_is_the_newest() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        seed(&dir, &["system_20250101000000", "system_20260823120000"]);
        assert_eq!(manager.current().unwrap().id, "system_20260823120000");
    }

    #[test]
    fn current_with_no_snapshots_is_an_error() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        assert!(matches!(
            manager.current().unwrap_err(),
            SnapshotError::NoSnapshots(_)
        ));
    }

    #[test]
    fn unreadable_snapshot_dir_is_not_reported_as_empty() {
        // A scan failure must not look like an empty history; the reconciler
        // warns about the former and treats the latter as a first run.
        let dir = TempDir::new().unwrap();
        let layout = SnapshotLayout::new(dir.path());
        std::fs::write(layout.snapshots_dir(), "").unwrap();
        let manager = SnapshotManager::new(layout);
        assert!(matches!(
            manager.current().unwrap_err(),
            SnapshotError::Io(_)
        ));
    }

    #[test]
    fn previous_is_the_second_newest() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        seed(
            &dir,
            &[
                "system_20240601000000",
                "system_20250101000000",
                "system_20260823120000",
            ],
        );
        assert_eq!(manager.previous().unwrap().id, "system_20250101000000");
    }

    #[test]
    fn previous_with_single_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        seed(&dir, &["system_20260823120000"]);
        assert!(matches!(
            manager.previous().unwrap_err(),
            SnapshotError::NoPrevious
        ));
    }

    #[test]
    fn create_snapshots_the_live_subvolume() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let exec = MockExecutor::new();
        let snapshot = manager
            .create_named(&exec, "system_20260823120000")
            .unwrap();
        assert_eq!(
            exec.calls(),
            vec![format!(
                "btrfs subvolume snapshot {}/@ {}/snapshots/system_20260823120000",
                dir.path().display(),
                dir.path().display()
            )]
        );
        assert_eq!(snapshot.id, "system_20260823120000");
    }

    #[test]
    fn create_uses_sortable_utc_stamp() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let exec = MockExecutor::new();
        let snapshot = manager.create(&exec).unwrap();
        let stamp = snapshot.id.strip_prefix("system_").unwrap();
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn create_failure_carries_command_output() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let exec = MockExecutor::new();
        exec.respond_prefix(
            "btrfs subvolume snapshot",
            CommandOutput::fail("ERROR: not a btrfs filesystem\n", "btrfs exited with code 1"),
        );
        let err = manager.create(&exec).unwrap_err();
        assert!(err.to_string().contains("not a btrfs filesystem"));
    }

    #[test]
    fn delete_issues_subvolume_delete() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        seed(&dir, &["system_20260823120000"]);
        let exec = MockExecutor::new();
        let current = manager.current().unwrap();
        manager.delete(&exec, &current).unwrap();
        assert_eq!(
            exec.calls(),
            vec![format!(
                "btrfs subvolume delete {}/snapshots/system_20260823120000",
                dir.path().display()
            )]
        );
    }
}
