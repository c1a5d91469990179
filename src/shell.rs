use crate::sys;
use std::future::Future;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Upper bound for reload commands and pid probes alike.
pub const COMMAND_TIMEOUT_MS: u64 = 10_000;

pub fn command_timeout() -> Duration {
    Duration::from_millis(COMMAND_TIMEOUT_MS)
}

// ---------------------------------------------------------------------------
// RunResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub exit_code: Option<i32>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// Execution-level failure: spawn error or timeout. Distinct from the
    /// invoked program exiting nonzero.
    pub error: Option<String>,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.exit_code == Some(0)
    }

    pub fn failure_detail(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        let status = match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "killed by signal".to_string(),
        };
        if self.stderr.is_empty() {
            status
        } else {
            format!("{status}; stderr: {}", self.stderr.join(" / "))
        }
    }
}

// ---------------------------------------------------------------------------
// CommandRunner capability
// ---------------------------------------------------------------------------

/// Narrow shell-execution seam so the engine's control flow can be exercised
/// with a fake runner instead of real processes.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str, timeout: Duration) -> impl Future<Output = RunResult> + Send;
}

pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, timeout: Duration) -> RunResult {
        let mut cmd = sys::shell_command(command);
        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        // Reap the child when the timeout drops the output future
        cmd.kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return RunResult {
                    error: Some(format!("failed to execute: {e}")),
                    ..RunResult::default()
                };
            }
            Err(_) => {
                return RunResult {
                    error: Some(format!("timed out after {}ms", timeout.as_millis())),
                    ..RunResult::default()
                };
            }
        };

        RunResult {
            exit_code: output.status.code(),
            stdout: lines(&output.stdout),
            stderr: lines(&output.stderr),
            error: None,
        }
    }
}

fn lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}
