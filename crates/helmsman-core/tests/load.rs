//! End-to-end reconciliation pass against a scripted host.

use helmsman_config::{DeploymentProfile, ServiceRegistry};
use helmsman_core::Engine;
use helmsman_host::{CommandOutput, ImageSource, MockExecutor, Provisioner};
use helmsman_snapshot::{SnapshotLayout, SnapshotManager, CONFIG_REL_PATH};
use std::path::PathBuf;
use tempfile::TempDir;

struct Host {
    root: TempDir,
    staging: TempDir,
    upper: TempDir,
    live: TempDir,
    exec: MockExecutor,
}

impl Host {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            staging: TempDir::new().unwrap(),
            upper: TempDir::new().unwrap(),
            live: TempDir::new().unwrap(),
            exec: MockExecutor::new(),
        }
    }

    fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.root.path().join("services.conf");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn seed_snapshot(&self, id: &str, config_contents: &str) {
        let config = self.root.path().join("snapshots").join(id).join(CONFIG_REL_PATH);
        std::fs::create_dir_all(config.parent().unwrap()).unwrap();
        std::fs::write(config, config_contents).unwrap();
    }

    fn script_unit_disabled(&self, unit: &str) {
        self.exec.respond(
            &format!("systemctl is-active {unit}"),
            CommandOutput::fail("inactive\n", "systemctl exited with code 3"),
        );
        self.exec.respond(
            &format!("systemctl is-enabled {unit}"),
            CommandOutput::ok("disabled\n"),
        );
    }

    fn engine(&self, config: PathBuf) -> Engine<'_> {
        Engine::new(
            &self.exec,
            ServiceRegistry::bundled(DeploymentProfile::DynamicProvisioning).unwrap(),
            ImageSource::default(),
            Provisioner::new(self.staging.path(), self.upper.path(), self.live.path()),
            SnapshotManager::new(SnapshotLayout::new(self.root.path())),
            config,
        )
    }
}

#[test]
fn unknown_enabled_service_is_provisioned_enabled_and_sealed() {
    let host = Host::new();
    let config = host.write_config("service.web.enable = true\n");
    host.script_unit_disabled("web-backend.service");

    let report = host.engine(config).load().unwrap();

    assert!(report.changed);
    assert_eq!(report.failures(), 0);
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].action, "provision+enable");
    let snapshot_id = report.snapshot.as_deref().unwrap();
    assert!(snapshot_id.starts_with("system_"));

    let image = ImageSource::default().service_image("web");
    let calls = host.exec.calls();
    assert_eq!(
        host.exec.call_count(&format!(
            "chroot {} podman pull {image}",
            host.staging.path().display()
        )),
        1
    );
    assert_eq!(
        host.exec.call_count("systemctl enable web-backend.service"),
        1
    );
    assert_eq!(
        calls
            .iter()
            .filter(|c| c.starts_with("btrfs subvolume snapshot"))
            .count(),
        1
    );

    // The unit file landed in the staging tree, fully rendered.
    let unit = host
        .staging
        .path()
        .join("etc/systemd/system/web-backend.service");
    let contents = std::fs::read_to_string(unit).unwrap();
    assert!(contents.contains(&image));
    assert!(!contents.contains("{{"));
}

#[test]
fn unchanged_configuration_short_circuits_the_pass() {
    let host = Host::new();
    let contents = "service.web.enable = true\n";
    let config = host.write_config(contents);
    host.seed_snapshot("system_20260823120000", contents);

    let report = host.engine(config).load().unwrap();

    assert!(!report.changed);
    assert!(report.outcomes.is_empty());
    assert!(host.exec.calls().is_empty());
}

#[test]
fn drifted_configuration_triggers_a_full_pass() {
    let host = Host::new();
    let config = host.write_config("service.web.enable = false\n");
    host.seed_snapshot("system_20260823120000", "service.web.enable = true\n");
    host.script_unit_disabled("web-backend.service");

    let report = host.engine(config).load().unwrap();

    assert!(report.changed);
    // Disabled, not yet materialized: provisioned offline, left disabled.
    assert_eq!(report.outcomes[0].action, "provision+disable");
    assert!(report.outcomes[0].ok);
}

#[test]
fn one_failing_service_does_not_stop_the_others() {
    let host = Host::new();
    let config = host.write_config(
        "service.web.enable = true\nservice.database.enable = true\n",
    );
    host.script_unit_disabled("web-backend.service");
    host.script_unit_disabled("database-backend.service");
    host.exec.respond(
        "systemctl enable database-backend.service",
        CommandOutput::fail("", "systemctl exited with code 1"),
    );

    let report = host.engine(config).load().unwrap();

    assert_eq!(report.failures(), 1);
    let web = report.outcomes.iter().find(|o| o.service == "web").unwrap();
    assert!(web.ok);
    let database = report
        .outcomes
        .iter()
        .find(|o| o.service == "database")
        .unwrap();
    assert!(!database.ok);
    assert!(database.detail.is_some());

    // A failed pass is not sealed, so the next run retries it.
    assert!(report.snapshot.is_none());
}

#[test]
fn malformed_configuration_aborts_before_touching_the_host() {
    let host = Host::new();
    let config = host.write_config("service.web.enable = true\nfoobar\n");

    let err = host.engine(config).load().unwrap_err();

    assert!(err.to_string().contains("foobar"));
    assert!(host.exec.calls().is_empty());
}
