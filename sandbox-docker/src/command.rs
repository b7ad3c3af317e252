use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::trace;

/// Error from a failed command.
#[derive(Debug, Clone, thiserror::Error)]
#[error("command failed: {command}\n{detail}")]
pub struct CommandError {
    pub command: String,
    pub detail: String,
}

/// How a command should be executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Privilege {
    /// Prefix with `sudo` (for hosts where the user is not in the `docker` group).
    Sudo,
    /// Run as the current user.
    #[default]
    User,
}

/// Format a human-readable display string for a direct command invocation.
pub(crate) fn format_command_display(
    program: &str,
    args: &[&str],
    privilege: Privilege,
) -> String {
    let mut parts = Vec::with_capacity(args.len() + 2);
    if matches!(privilege, Privilege::Sudo) {
        parts.push("sudo");
    }
    parts.push(program);
    parts.extend_from_slice(args);
    parts.join(" ")
}

fn build(program: &str, args: &[&str], privilege: Privilege) -> Command {
    let mut command = match privilege {
        Privilege::Sudo => {
            let mut c = Command::new("sudo");
            c.arg("-n").arg(program);
            c
        }
        Privilege::User => Command::new(program),
    };
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    command
}

/// Run a command to completion and return its raw output, whatever the exit status.
///
/// Only a failure to spawn or wait on the process is an error here.
pub async fn output(
    program: &str,
    args: &[&str],
    privilege: Privilege,
) -> Result<Output, CommandError> {
    let cmd_display = format_command_display(program, args, privilege);
    trace!(command = %cmd_display, "output");

    build(program, args, privilege)
        .output()
        .await
        .map_err(|e| CommandError {
            command: cmd_display,
            detail: e.to_string(),
        })
}

/// Execute a command.
///
/// Returns trimmed stdout on success, trimmed stderr as the error detail otherwise.
pub async fn exec(
    program: &str,
    args: &[&str],
    privilege: Privilege,
) -> Result<String, CommandError> {
    let output = output(program, args, privilege).await?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(CommandError {
            command: format_command_display(program, args, privilege),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
