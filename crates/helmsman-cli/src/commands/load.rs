use super::{json_pretty, print_outcomes, spin_fail, spin_ok, spinner, EXIT_FAILURE, EXIT_SUCCESS};
use helmsman_core::Engine;
use std::path::Path;
use tracing::info;

const DEFAULT_CONFIG: &str = "\
# Helmsman service configuration.
# One declaration per line:
#   service.<name>.enable = true|false
";

pub fn run(engine: &Engine<'_>, config: &Path, json: bool) -> Result<u8, String> {
    ensure_config(config).map_err(|e| e.to_string())?;

    let pb = (!json).then(|| spinner("reconciling services"));
    let report = match engine.load() {
        Ok(report) => {
            if let Some(pb) = &pb {
                if report.failures() == 0 {
                    spin_ok(pb, "reconciliation finished");
                } else {
                    spin_fail(pb, "reconciliation finished with failures");
                }
            }
            report
        }
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, "reconciliation failed");
            }
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", json_pretty(&report)?);
    } else if !report.changed {
        println!("configuration unchanged, nothing to do");
    } else {
        print_outcomes(&report.outcomes);
        match &report.snapshot {
            Some(id) => println!("sealed as snapshot {id}"),
            None => println!("no snapshot taken, the next run will retry"),
        }
    }

    if report.failures() > 0 {
        Ok(EXIT_FAILURE)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Create the configuration file with a commented template on first boot.
fn ensure_config(config: &Path) -> std::io::Result<()> {
    if config.exists() {
        return Ok(());
    }
    if let Some(parent) = config.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config, DEFAULT_CONFIG)?;
    info!("created default configuration at {}", config.display());
    Ok(())
}
