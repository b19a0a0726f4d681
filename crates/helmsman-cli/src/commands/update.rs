use super::{json_pretty, print_outcomes, spin_fail, spin_ok, spinner, EXIT_FAILURE, EXIT_SUCCESS};
use helmsman_core::Engine;
use std::path::Path;

pub fn run(engine: &Engine<'_>, config: &Path, json: bool) -> Result<u8, String> {
    if !config.exists() {
        return Err(format!("no configuration at {}", config.display()));
    }

    let pb = (!json).then(|| spinner("checking for image updates"));
    let report = match engine.update() {
        Ok(report) => {
            if let Some(pb) = &pb {
                if report.failures() == 0 {
                    spin_ok(pb, "update check finished");
                } else {
                    spin_fail(pb, "update check finished with failures");
                }
            }
            report
        }
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, "update check failed");
            }
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", json_pretty(&report)?);
    } else if report.checked == 0 {
        println!("no managed images to check");
    } else {
        print_outcomes(&report.outcomes);
        if report.updated.is_empty() {
            println!("all images up to date");
        } else if let Some(id) = &report.snapshot {
            println!("updated {} service(s), sealed as snapshot {id}", report.updated.len());
        }
    }

    if report.failures() > 0 {
        Ok(EXIT_FAILURE)
    } else {
        Ok(EXIT_SUCCESS)
    }
}
