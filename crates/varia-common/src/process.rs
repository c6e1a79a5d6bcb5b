//! Bounded subprocess execution.

use std::{io, process::Output, process::Stdio, time::Duration};

use tokio::{process::Command, time};
use tracing::warn;

/// Outcome of running a command under a deadline.
#[derive(Debug)]
pub enum CommandOutcome {
    /// The process exited before the deadline.
    Completed(Output),
    /// The deadline elapsed and the process was killed.
    TimedOut,
}

impl CommandOutcome {
    /// Returns the captured output if the process completed successfully.
    pub fn success(&self) -> Option<&Output> {
        match self {
            Self::Completed(output) if output.status.success() => Some(output),
            _ => None,
        }
    }
}

/// Runs a command, capturing output, killing it if the deadline elapses.
///
/// # Errors
///
/// Returns error if the process cannot be spawned.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
) -> io::Result<CommandOutcome> {
    cmd.kill_on_drop(true);
    match time::timeout(timeout, cmd.output()).await {
        Ok(output) => Ok(CommandOutcome::Completed(output?)),
        Err(_) => Ok(CommandOutcome::TimedOut),
    }
}

/// Runs a shell command via `sh -c` under a deadline.
///
/// Non-zero exits and timeouts are logged at warn level; the outcome is
/// returned so callers can react without re-parsing stderr.
///
/// # Errors
///
/// Returns error if the shell process cannot be spawned.
pub async fn run_shell_with_timeout(cmd: &str, timeout: Duration) -> io::Result<CommandOutcome> {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd).stdin(Stdio::null());

    let outcome = run_with_timeout(command, timeout).await?;

    match &outcome {
        CommandOutcome::Completed(output) if !output.status.success() => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                warn!(cmd = %cmd, exit_code = ?output.status.code(), "command failed");
            } else {
                warn!(
                    cmd = %cmd,
                    exit_code = ?output.status.code(),
                    stderr = %stderr,
                    "command failed"
                );
            }
        }
        CommandOutcome::TimedOut => {
            warn!(cmd = %cmd, timeout_secs = timeout.as_secs(), "command timed out");
        }
        CommandOutcome::Completed(_) => {}
    }

    Ok(outcome)
}
