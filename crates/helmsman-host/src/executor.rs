use std::process::Command;
use tracing::debug;

/// Captured result of one external command invocation.
///
/// `output` always carries the combined stdout+stderr so a failure can be
/// diagnosed without re-running the command by hand; `message` is the
/// spawn/exit description and is empty on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: String,
    pub ok: bool,
    pub message: String,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ok: true,
            message: String::new(),
        }
    }

    pub fn fail(output: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ok: false,
            message: message.into(),
        }
    }
}

/// Narrow capability for running external programs.
///
/// Every component that shells out takes this by reference, so tests can
/// substitute [`crate::MockExecutor`] and assert on the exact arguments
/// issued. Execution is synchronous and unbounded: a hung subprocess hangs
/// the caller, matching the host's single-run execution model.
pub trait CommandExecutor {
    fn run(&self, program: &str, args: &[&str]) -> CommandOutput;
}

/// Executor that runs commands on the real host.
#[derive(Debug, Default)]
pub struct HostExecutor;

impl HostExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for HostExecutor {
    fn run(&self, program: &str, args: &[&str]) -> CommandOutput {
        debug!("exec: {program} {}", args.join(" "));
        match Command::new(program).args(args).output() {
            Ok(out) => {
                let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&out.stderr));
                if out.status.success() {
                    CommandOutput::ok(combined)
                } else {
                    let message = match out.status.code() {
                        Some(code) => format!("{program} exited with code {code}"),
                        None => format!("{program} terminated by signal"),
                    };
                    CommandOutput::fail(combined, message)
                }
            }
            Err(e) => CommandOutput::fail(String::new(), format!("failed to spawn {program}: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_succeeds() {
        let out = HostExecutor::new().run("true", &[]);
        assert!(out.ok);
        assert!(out.message.is_empty());
    }

    #[test]
    fn false_fails_with_exit_code() {
        let out = HostExecutor::new().run("false", &[]);
        assert!(!out.ok);
        assert!(out.message.contains("exited with code 1"));
    }

    #[test]
    fn captures_stdout() {
        let out = HostExecutor::new().run("echo", &["hello"]);
        assert!(out.ok);
        assert_eq!(out.output.trim(), "hello");
    }

    #[test]
    fn missing_program_reports_spawn_failure() {
        let out = HostExecutor::new().run("helmsman-no-such-program", &[]);
        assert!(!out.ok);
        assert!(out.message.contains("failed to spawn"));
    }
}
