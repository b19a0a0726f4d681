use super::{json_pretty, EXIT_SUCCESS};
use helmsman_core::Engine;

pub fn run(engine: &Engine<'_>, json: bool) -> Result<u8, String> {
    let snapshots = engine.snapshots().map_err(|e| e.to_string())?;

    if json {
        let entries: Vec<_> = snapshots
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "path": s.path,
                })
            })
            .collect();
        println!("{}", json_pretty(&entries)?);
    } else if snapshots.is_empty() {
        println!("no snapshots");
    } else {
        let last = snapshots.len() - 1;
        for (i, snapshot) in snapshots.iter().enumerate() {
            if i == last {
                println!("{} (current)", snapshot.id);
            } else {
                println!("{}", snapshot.id);
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
