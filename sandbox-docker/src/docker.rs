use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use sandbox::SandboxError;
use tracing::{debug, info};

use crate::command::{self, CommandError, Privilege};
use crate::prerequisites::check_prerequisites;
use crate::runtime::{ContainerHandle, ContainerRuntime, ExecOutput, RunSpec, RuntimeError};

/// Stderr prefixes the docker CLI uses when it or the daemon failed, not the command.
const DAEMON_ERROR_PREFIXES: &[&str] = &[
    "Error response from daemon:",
    "Error: No such container",
    "OCI runtime exec failed",
    "Cannot connect to the Docker daemon",
    "permission denied while trying to connect to the Docker daemon",
    "error during connect",
    "failed to connect to the docker API",
];

/// `ContainerRuntime` backed by the `docker` command-line client.
///
/// Every call spawns a `docker` process through `tokio::process`, so nothing
/// blocks the executor. Cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
    privilege: Privilege,
}

impl DockerCli {
    /// Create a client without checking that docker is usable.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            privilege: Privilege::User,
        }
    }

    /// Resolve `binary` on `PATH` and verify the daemon answers before returning a client.
    pub async fn connect(binary: &str, privilege: Privilege) -> Result<Self, SandboxError> {
        let resolved = check_prerequisites(binary, privilege).await?;
        info!(binary = %resolved, ?privilege, "docker runtime ready");
        Ok(Self {
            binary: resolved,
            privilege,
        })
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn output(&self, args: &[&str]) -> Result<Output, RuntimeError> {
        Ok(command::output(&self.binary, args, self.privilege).await?)
    }

    /// Run a control command where any non-zero exit is a runtime failure.
    async fn control(&self, args: &[&str]) -> Result<String, RuntimeError> {
        let output = self.output(args).await?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(classify_failure(
            command::format_command_display(&self.binary, args, self.privilege),
            stderr,
        ))
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    fn name(&self) -> &str {
        "docker"
    }

    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, RuntimeError> {
        let args = run_args(spec);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let id = self.control(&args).await?;
        // `docker run -d` prints the full container id; pull progress goes to stderr.
        let id = id.lines().last().unwrap_or_default().trim();
        if id.is_empty() {
            return Err(RuntimeError::Api(format!(
                "docker run for {} returned no container id",
                spec.image
            )));
        }
        Ok(ContainerHandle::new(id))
    }

    async fn exec(
        &self,
        container: &ContainerHandle,
        cmd: &str,
    ) -> Result<ExecOutput, RuntimeError> {
        let args = exec_args(container, cmd);
        let output = self.output(&args).await?;
        let exit_code = output.status.code().unwrap_or(-1);

        if exit_code != 0 {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_daemon_failure(&stderr) {
                return Err(classify_failure(
                    command::format_command_display(&self.binary, &args, self.privilege),
                    stderr.trim().to_string(),
                ));
            }
        }

        debug!(id = %container, exit_code, "docker exec finished");
        Ok(ExecOutput {
            exit_code,
            stdout: non_empty(output.stdout),
            stderr: non_empty(output.stderr),
        })
    }

    async fn stop(
        &self,
        container: &ContainerHandle,
        timeout: Duration,
    ) -> Result<(), RuntimeError> {
        let secs = timeout.as_secs().to_string();
        self.control(&["stop", "--time", &secs, container.id()])
            .await
            .map(|_| ())
    }

    async fn remove(&self, container: &ContainerHandle) -> Result<(), RuntimeError> {
        self.control(&["rm", "--force", "--volumes", container.id()])
            .await
            .map(|_| ())
    }
}

/// Arguments for `docker run`, limits included so they apply at creation.
pub(crate) fn run_args(spec: &RunSpec) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--detach".to_string(),
        "--tty".to_string(),
        "--name".to_string(),
        spec.name.clone(),
        "--cpu-quota".to_string(),
        spec.cpu_quota.to_string(),
        "--memory".to_string(),
        spec.mem_limit.clone(),
    ];
    if let Some(network) = &spec.network_mode {
        args.push(format!("--network={network}"));
    }
    args.push(spec.image.clone());
    args
}

pub(crate) fn exec_args<'a>(container: &'a ContainerHandle, cmd: &'a str) -> [&'a str; 5] {
    ["exec", container.id(), "sh", "-c", cmd]
}

fn is_daemon_failure(stderr: &str) -> bool {
    let first = stderr.lines().next().unwrap_or_default().trim();
    DAEMON_ERROR_PREFIXES.iter().any(|p| first.starts_with(p))
}

fn is_not_found(stderr: &str) -> bool {
    stderr.to_ascii_lowercase().contains("no such container")
}

fn classify_failure(command: String, stderr: String) -> RuntimeError {
    if is_not_found(&stderr) {
        RuntimeError::NotFound(stderr)
    } else {
        RuntimeError::Command(CommandError {
            command,
            detail: stderr,
        })
    }
}

fn non_empty(bytes: Vec<u8>) -> Option<Vec<u8>> {
    if bytes.is_empty() { None } else { Some(bytes) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> RunSpec {
        RunSpec {
            name: "sandbox-test".into(),
            image: "python:3.12-slim".into(),
            cpu_quota: 50_000,
            mem_limit: "512m".into(),
            network_mode: None,
        }
    }

    #[test]
    fn run_args_apply_limits_at_creation() {
        assert_eq!(
            run_args(&spec()),
            [
                "run",
                "--detach",
                "--tty",
                "--name",
                "sandbox-test",
                "--cpu-quota",
                "50000",
                "--memory",
                "512m",
                "python:3.12-slim",
            ]
        );
    }

    #[test]
    fn run_args_place_network_before_image() {
        let spec = RunSpec {
            network_mode: Some("none".into()),
            ..spec()
        };
        let args = run_args(&spec);
        assert_eq!(args.get(args.len() - 2).map(String::as_str), Some("--network=none"));
        assert_eq!(args.last().map(String::as_str), Some("python:3.12-slim"));
    }

    #[test]
    fn exec_args_wrap_command_in_shell() {
        let handle = ContainerHandle::new("abc123");
        assert_eq!(
            exec_args(&handle, "echo 'Hello World'"),
            ["exec", "abc123", "sh", "-c", "echo 'Hello World'"]
        );
    }

    #[test]
    fn daemon_failures_are_recognized() {
        assert!(is_daemon_failure(
            "Error response from daemon: container abc is not running\n"
        ));
        assert!(is_daemon_failure("Error: No such container: abc"));
        assert!(is_daemon_failure(
            "OCI runtime exec failed: exec failed: unable to start container process"
        ));
        assert!(is_daemon_failure(
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. \
             Is the docker daemon running?"
        ));
        assert!(is_daemon_failure(
            "permission denied while trying to connect to the Docker daemon socket at \
             unix:///var/run/docker.sock"
        ));
        assert!(is_daemon_failure(
            "error during connect: Get \"http://%2F%2F.%2Fpipe%2Fdocker_engine/v1.24/version\""
        ));
        assert!(!is_daemon_failure("ls: cannot access 'x': No such file or directory"));
        assert!(!is_daemon_failure("sh: 1: cannot connect to server"));
        assert!(!is_daemon_failure(""));
    }

    #[test]
    fn missing_container_classifies_as_not_found() {
        let err = classify_failure(
            "docker stop abc".into(),
            "Error response from daemon: No such container: abc".into(),
        );
        assert!(matches!(err, RuntimeError::NotFound(_)), "got: {err:?}");
    }

    #[test]
    fn other_failures_keep_command_and_detail() {
        let err = classify_failure(
            "docker rm abc".into(),
            "Error response from daemon: removal already in progress".into(),
        );
        match err {
            RuntimeError::Command(e) => {
                assert_eq!(e.command, "docker rm abc");
                assert!(e.detail.contains("already in progress"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_streams_become_none() {
        assert_eq!(non_empty(Vec::new()), None);
        assert_eq!(non_empty(b"x".to_vec()), Some(b"x".to_vec()));
    }
}
