use crate::executor::{CommandExecutor, CommandOutput};
use std::sync::Mutex;

/// Scripted executor for tests.
///
/// Responses are keyed by the full command line (`program arg1 arg2 …`);
/// unscripted commands succeed with empty output, so tests only script the
/// invocations they care about. Every issued command line is recorded for
/// assertion.
#[derive(Default)]
pub struct MockExecutor {
    responses: Mutex<Vec<(String, CommandOutput)>>,
    calls: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for an exact command line.
    pub fn respond(&self, command_line: &str, output: CommandOutput) {
        self.responses
            .lock()
            .expect("mock mutex")
            .push((command_line.to_owned(), output));
    }

    /// Script a response for every command line starting with the prefix.
    pub fn respond_prefix(&self, prefix: &str, output: CommandOutput) {
        // Stored alongside exact entries; lookup tries exact first.
        self.responses
            .lock()
            .expect("mock mutex")
            .push((format!("{prefix}*"), output));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock mutex").clone()
    }

    pub fn call_count(&self, command_line: &str) -> usize {
        self.calls
            .lock()
            .expect("mock mutex")
            .iter()
            .filter(|c| *c == command_line)
            .count()
    }
}

impl CommandExecutor for MockExecutor {
    fn run(&self, program: &str, args: &[&str]) -> CommandOutput {
        let line = if args.is_empty() {
            program.to_owned()
        } else {
            format!("{program} {}", args.join(" "))
        };
        self.calls.lock().expect("mock mutex").push(line.clone());

        let responses = self.responses.lock().expect("mock mutex");
        for (key, output) in responses.iter() {
            if *key == line {
                return output.clone();
            }
        }
        for (key, output) in responses.iter() {
            if let Some(prefix) = key.strip_suffix('*') {
                if line.starts_with(prefix) {
                    return output.clone();
                }
            }
        }
        CommandOutput::ok("")
    }
}
