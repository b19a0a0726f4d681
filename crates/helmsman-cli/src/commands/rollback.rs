use super::{json_pretty, EXIT_SUCCESS};
use helmsman_core::Engine;
use helmsman_snapshot::RollbackOutcome;

pub fn run(engine: &Engine<'_>, no_reboot: bool, json: bool) -> Result<u8, String> {
    let outcome = engine.rollback(!no_reboot).map_err(|e| e.to_string())?;

    match outcome {
        RollbackOutcome::RolledBack {
            restored,
            discarded,
        } => {
            if json {
                let payload = serde_json::json!({
                    "rolled_back": true,
                    "restored": restored.id,
                    "discarded": discarded,
                    "reboot": !no_reboot,
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!("restored {} (discarded {discarded})", restored.id);
                if no_reboot {
                    println!("reboot skipped, the restored root takes effect on next boot");
                }
            }
        }
        RollbackOutcome::NothingToRollBack => {
            if json {
                println!("{}", json_pretty(&serde_json::json!({"rolled_back": false}))?);
            } else {
                println!("nothing to roll back to");
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
