use crate::decision::{decide, ReconcileDecision, ServiceFacts};
use crate::CoreError;
use helmsman_config::{read_declarations, DeploymentProfile, ServiceDeclaration, ServiceRegistry};
use helmsman_host::{image, mount, provision, systemd, CommandExecutor, ImageSource, Provisioner};
use helmsman_snapshot::{
    configuration_changed, RollbackOutcome, Snapshot, SnapshotError, SnapshotManager,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// What happened to one declared service during a pass.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceOutcome {
    pub service: String,
    pub action: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ServiceOutcome {
    fn ok(service: &str, action: impl Into<String>) -> Self {
        Self {
            service: service.to_owned(),
            action: action.into(),
            ok: true,
            detail: None,
        }
    }

    fn failed(service: &str, action: impl Into<String>, detail: String) -> Self {
        Self {
            service: service.to_owned(),
            action: action.into(),
            ok: false,
            detail: Some(detail),
        }
    }
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    /// False when the drift gate found the configuration identical to the
    /// newest snapshot and the pass was skipped entirely.
    pub changed: bool,
    pub outcomes: Vec<ServiceOutcome>,
    /// Id of the snapshot sealing this pass, when one was taken.
    pub snapshot: Option<String>,
}

impl ReconcileReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.ok).count()
    }
}

/// Result of an image update pass.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub checked: usize,
    /// Services whose image was actually refreshed.
    pub updated: Vec<String>,
    pub outcomes: Vec<ServiceOutcome>,
    pub snapshot: Option<String>,
}

impl UpdateReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.ok).count()
    }
}

/// Drives reconciliation, updates, and rollback against one host.
///
/// All host access goes through the injected executor; the engine itself
/// never spawns processes, which is what makes the whole pipeline testable
/// against a scripted mock.
pub struct Engine<'a> {
    exec: &'a dyn CommandExecutor,
    registry: ServiceRegistry,
    source: ImageSource,
    provisioner: Provisioner,
    snapshots: SnapshotManager,
    config_path: PathBuf,
    manage_mount: bool,
}

impl<'a> Engine<'a> {
    pub fn new(
        exec: &'a dyn CommandExecutor,
        registry: ServiceRegistry,
        source: ImageSource,
        provisioner: Provisioner,
        snapshots: SnapshotManager,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            exec,
            registry,
            source,
            provisioner,
            snapshots,
            config_path: config_path.into(),
            manage_mount: false,
        }
    }

    /// Mount the btrfs top level before each pass and unmount it after.
    /// Off by default so tests can run against plain directories.
    #[must_use]
    pub fn manage_mount(mut self, yes: bool) -> Self {
        self.manage_mount = yes;
        self
    }

    /// Reconcile the declared configuration against host state.
    ///
    /// Skipped entirely when the configuration matches the copy in the newest
    /// snapshot. Per-service failures are isolated: one broken service does
    /// not stop the others, but any failure suppresses the sealing snapshot
    /// so the next run retries the whole pass.
    pub fn load(&self) -> Result<ReconcileReport, CoreError> {
        self.with_mounted(Self::load_inner)
    }

    fn load_inner(&self) -> Result<ReconcileReport, CoreError> {
        self.snapshots.layout().initialize()?;

        match self.snapshots.current() {
            Ok(current) => {
                if !configuration_changed(self.snapshots.layout(), &self.config_path, &current) {
                    info!("configuration unchanged since {}, nothing to do", current.id);
                    return Ok(ReconcileReport {
                        changed: false,
                        outcomes: Vec::new(),
                        snapshot: None,
                    });
                }
            }
            Err(SnapshotError::NoSnapshots(_)) => {}
            Err(e) => {
                warn!(
                    "cannot determine the current snapshot: {e}; treating configuration as changed"
                );
            }
        }

        let declarations = read_declarations(&self.config_path)?;
        image::login(self.exec, &self.source)?;

        let outcomes: Vec<_> = declarations
            .iter()
            .map(|decl| self.reconcile_service(decl))
            .collect();

        let snapshot = if outcomes.iter().all(|o| o.ok) {
            Some(self.snapshots.create(self.exec)?.id)
        } else {
            warn!(
                "{} service(s) failed, skipping snapshot so the next run retries",
                outcomes.iter().filter(|o| !o.ok).count()
            );
            None
        };

        Ok(ReconcileReport {
            changed: true,
            outcomes,
            snapshot,
        })
    }

    fn reconcile_service(&self, decl: &ServiceDeclaration) -> ServiceOutcome {
        let unit = provision::unit_name(&decl.name);
        let image_ref = self.source.service_image(&decl.name);
        let template = if self.registry.profile() == DeploymentProfile::DynamicProvisioning {
            self.registry.template(&decl.name)
        } else {
            None
        };
        let decision = decide(ServiceFacts {
            enabled: decl.enabled,
            is_default: self.registry.is_default(&decl.name),
            image_present: image::image_present(self.exec, &image_ref),
            has_template: template.is_some(),
        });
        info!("service {}: {decision}", decl.name);

        let result: Result<(), CoreError> = match (decision, template) {
            (ReconcileDecision::Enable, _) => {
                systemd::enable(self.exec, &unit).map_err(Into::into)
            }
            (ReconcileDecision::Disable, _) => {
                systemd::disable(self.exec, &unit).map_err(Into::into)
            }
            (ReconcileDecision::ProvisionAndEnable, Some(template)) => {
                self.provisioner
                    .provision(self.exec, template, &decl.name, &image_ref)
                    .and_then(|()| systemd::enable(self.exec, &unit))
                    .map_err(Into::into)
            }
            (ReconcileDecision::ProvisionAndDisable, Some(template)) => {
                self.provisioner
                    .provision(self.exec, template, &decl.name, &image_ref)
                    .and_then(|()| systemd::disable(self.exec, &unit))
                    .map_err(Into::into)
            }
            (ReconcileDecision::TemplateMissing, _)
            | (
                ReconcileDecision::ProvisionAndEnable | ReconcileDecision::ProvisionAndDisable,
                None,
            ) => {
                warn!(
                    "service {} is not a default and has no provisioning template",
                    decl.name
                );
                return ServiceOutcome::failed(
                    &decl.name,
                    decision.to_string(),
                    "no provisioning template for this service".to_owned(),
                );
            }
        };

        match result {
            Ok(()) => ServiceOutcome::ok(&decl.name, decision.to_string()),
            Err(e) => {
                warn!("service {} failed: {e}", decl.name);
                ServiceOutcome::failed(&decl.name, decision.to_string(), e.to_string())
            }
        }
    }

    /// Refresh images of enabled services whose registry digest moved.
    ///
    /// Only services whose image is already in local storage are considered;
    /// a snapshot is taken only when at least one service was actually
    /// updated and nothing failed.
    pub fn update(&self) -> Result<UpdateReport, CoreError> {
        self.with_mounted(Self::update_inner)
    }

    fn update_inner(&self) -> Result<UpdateReport, CoreError> {
        self.snapshots.layout().initialize()?;
        let declarations = read_declarations(&self.config_path)?;
        image::login(self.exec, &self.source)?;

        let mut outcomes = Vec::new();
        let mut updated = Vec::new();
        for decl in declarations.iter().filter(|d| d.enabled) {
            let image_ref = self.source.service_image(&decl.name);
            if !image::image_present(self.exec, &image_ref) {
                continue;
            }
            let outcome = self.update_service(&decl.name, &image_ref);
            if outcome.ok && outcome.action == "update" {
                updated.push(decl.name.clone());
            }
            outcomes.push(outcome);
        }

        let snapshot = if !updated.is_empty() && outcomes.iter().all(|o| o.ok) {
            Some(self.snapshots.create(self.exec)?.id)
        } else {
            None
        };

        Ok(UpdateReport {
            checked: outcomes.len(),
            updated,
            outcomes,
            snapshot,
        })
    }

    fn update_service(&self, name: &str, image_ref: &str) -> ServiceOutcome {
        let run = || -> Result<bool, CoreError> {
            let remote = image::remote_digest(self.exec, image_ref)?;
            if image::local_digest(self.exec, image_ref).as_deref() == Some(remote.as_str()) {
                return Ok(false);
            }
            let unit = provision::unit_name(name);
            systemd::disable(self.exec, &unit)?;
            image::pull(self.exec, image_ref)?;
            systemd::enable(self.exec, &unit)?;
            Ok(true)
        };
        match run() {
            Ok(true) => {
                info!("updated {name}");
                ServiceOutcome::ok(name, "update")
            }
            Ok(false) => ServiceOutcome::ok(name, "up-to-date"),
            Err(e) => {
                warn!("update of {name} failed: {e}");
                ServiceOutcome::failed(name, "update", e.to_string())
            }
        }
    }

    /// Swap the live subvolume for the previous snapshot, then reboot.
    /// With fewer than two snapshots nothing happens, including the reboot.
    pub fn rollback(&self, reboot_after: bool) -> Result<RollbackOutcome, CoreError> {
        self.with_mounted(|e| {
            e.snapshots.layout().initialize()?;
            let outcome = helmsman_snapshot::rollback(e.exec, &e.snapshots)?;
            if reboot_after && matches!(outcome, RollbackOutcome::RolledBack { .. }) {
                helmsman_snapshot::reboot(e.exec);
            }
            Ok(outcome)
        })
    }

    /// All snapshots, oldest first.
    pub fn snapshots(&self) -> Result<Vec<Snapshot>, CoreError> {
        self.with_mounted(|e| {
            e.snapshots.layout().initialize()?;
            e.snapshots.list().map_err(Into::into)
        })
    }

    fn with_mounted<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        if !self.manage_mount {
            return f(self);
        }
        let root = self.snapshots.layout().root().to_path_buf();
        match mount::root_device(self.exec) {
            Some(device) => {
                mount::mount_disk(self.exec, &device, &root)?;
                let result = f(self);
                if let Err(e) = mount::unmount(self.exec, &root) {
                    warn!("{e}");
                }
                result
            }
            None => {
                warn!(
                    "cannot determine root device, assuming {} is already mounted",
                    root.display()
                );
                f(self)
            }
        }
    }
}
