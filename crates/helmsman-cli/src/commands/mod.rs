pub mod completions;
pub mod load;
pub mod rollback;
pub mod snapshots;
pub mod update;

use helmsman_core::ServiceOutcome;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_LOCKED: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn print_outcomes(outcomes: &[ServiceOutcome]) {
    use console::Style;
    for outcome in outcomes {
        let mark = if outcome.ok {
            Style::new().green().apply_to("✓").to_string()
        } else {
            Style::new().red().apply_to("✗").to_string()
        };
        match &outcome.detail {
            Some(detail) => println!("  {mark} {:<16} {:<18} {detail}", outcome.service, outcome.action),
            None => println!("  {mark} {:<16} {}", outcome.service, outcome.action),
        }
    }
}
