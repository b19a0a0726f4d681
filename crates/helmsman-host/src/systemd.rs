use crate::executor::CommandExecutor;
use crate::HostError;
use tracing::{debug, info, warn};

/// Observed enablement/running state of a systemd unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    NotFound,
    Disabled,
    Enabled,
    Active,
}

/// Query a unit's state via `is-active` / `is-enabled`.
///
/// Anything systemd does not recognize as enabled or disabled (including a
/// missing unit file) reports `NotFound`; callers treat that as "nothing to
/// manage yet".
pub fn unit_state(exec: &dyn CommandExecutor, unit: &str) -> UnitState {
    let active = exec.run("systemctl", &["is-active", unit]);
    if active.output.trim() == "active" {
        return UnitState::Active;
    }

    let enabled = exec.run("systemctl", &["is-enabled", unit]);
    match enabled.output.trim() {
        "enabled" | "enabled-runtime" => UnitState::Enabled,
        "disabled" => UnitState::Disabled,
        _ => UnitState::NotFound,
    }
}

/// Enable and start a unit. Idempotent: an already-active unit is restarted
/// to pick up a possibly updated image and reported as success.
pub fn enable(exec: &dyn CommandExecutor, unit: &str) -> Result<(), HostError> {
    match unit_state(exec, unit) {
        UnitState::Active => {
            debug!("{unit} already active, restarting to pick up updates");
            restart(exec, unit)
        }
        UnitState::NotFound => Err(HostError::UnitNotFound(unit.to_owned())),
        UnitState::Disabled | UnitState::Enabled => {
            let resp = exec.run("systemctl", &["enable", unit]);
            if !resp.ok {
                return Err(op_error("enabling", unit, &resp.message, &resp.output));
            }

            let resp = exec.run("systemctl", &["start", unit]);
            if !resp.ok {
                let tail = journal_tail(exec, unit);
                let detail = format!(
                    "{}: {}\nrecent journal entries:\n{tail}",
                    resp.message,
                    resp.output.trim()
                );
                return Err(HostError::UnitOperation {
                    operation: "starting",
                    unit: unit.to_owned(),
                    detail,
                });
            }

            daemon_reload(exec, unit)?;
            info!("enabled and started {unit}");
            Ok(())
        }
    }
}

/// Stop and disable a unit. Idempotent: a missing or already-disabled unit is
/// a successful no-op with no commands issued beyond the state query.
pub fn disable(exec: &dyn CommandExecutor, unit: &str) -> Result<(), HostError> {
    match unit_state(exec, unit) {
        UnitState::NotFound => {
            debug!("{unit} does not exist, nothing to disable");
            Ok(())
        }
        UnitState::Disabled => {
            debug!("{unit} already disabled");
            Ok(())
        }
        UnitState::Enabled | UnitState::Active => {
            let resp = exec.run("systemctl", &["stop", unit]);
            if !resp.ok {
                // The subsequent disable still removes it from the boot set.
                warn!("error stopping {unit}: {} {}", resp.message, resp.output.trim());
            }

            let resp = exec.run("systemctl", &["disable", unit]);
            if !resp.ok {
                return Err(op_error("disabling", unit, &resp.message, &resp.output));
            }

            // Best effort: clearing failure counters does not change the outcome.
            let resp = exec.run("systemctl", &["reset-failed", unit]);
            if !resp.ok {
                warn!("error resetting failure state of {unit}: {}", resp.message);
            }

            daemon_reload(exec, unit)?;
            info!("stopped and disabled {unit}");
            Ok(())
        }
    }
}

/// Restart a unit, reloading supervisor state afterwards.
pub fn restart(exec: &dyn CommandExecutor, unit: &str) -> Result<(), HostError> {
    let resp = exec.run("systemctl", &["restart", unit]);
    if !resp.ok {
        return Err(op_error("restarting", unit, &resp.message, &resp.output));
    }
    daemon_reload(exec, unit)
}

fn daemon_reload(exec: &dyn CommandExecutor, unit: &str) -> Result<(), HostError> {
    let resp = exec.run("systemctl", &["daemon-reload"]);
    if resp.ok {
        Ok(())
    } else {
        Err(op_error("reloading daemon after changing", unit, &resp.message, &resp.output))
    }
}

fn journal_tail(exec: &dyn CommandExecutor, unit: &str) -> String {
    let resp = exec.run("journalctl", &["-u", unit, "--no-pager", "--lines=50"]);
    if resp.ok {
        resp.output
    } else {
        format!("(journal unavailable: {})", resp.message)
    }
}

fn op_error(operation: &'static str, unit: &str, message: &str, output: &str) -> HostError {
    let detail = if output.trim().is_empty() {
        message.to_owned()
    } else {
        format!("{message}: {}", output.trim())
    };
    HostError::UnitOperation {
        operation,
        unit: unit.to_owned(),
        detail,
    }
}
