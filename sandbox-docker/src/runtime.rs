use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::command::CommandError;

/// Everything the runtime needs to create and start a container in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// Unique container name; `remove` accepts it in place of an id.
    pub name: String,
    pub image: String,
    /// CPU microseconds per 100ms scheduler period.
    pub cpu_quota: i64,
    /// Memory ceiling with a unit suffix, passed through as given (e.g. "512m").
    pub mem_limit: String,
    pub network_mode: Option<String>,
}

/// Reference to a container the runtime created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle {
    id: String,
}

impl ContainerHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// First 12 characters of the id, as `docker ps` shows it.
    pub fn short_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_id())
    }
}

/// Raw result of an exec with stdout and stderr kept apart.
///
/// A stream is `None` when the runtime delivered nothing for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: Option<Vec<u8>>,
    pub stderr: Option<Vec<u8>>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// The container does not exist (never created, or removed externally).
    #[error("no such container: {0}")]
    NotFound(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("runtime error: {0}")]
    Api(String),

    #[error("runtime worker failed: {0}")]
    Worker(String),
}

/// Control plane of a container runtime.
///
/// One client is shared by any number of sandboxes, so implementations must
/// tolerate concurrent calls for unrelated containers.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Human-readable name for this runtime (e.g. "docker").
    fn name(&self) -> &str;
    /// Create and start a detached container with its resource limits applied.
    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, RuntimeError>;
    /// Run `cmd` through a shell in the container, capturing stdout and stderr separately.
    async fn exec(&self, container: &ContainerHandle, cmd: &str)
    -> Result<ExecOutput, RuntimeError>;
    /// Halt the container, killing it once `timeout` has elapsed.
    async fn stop(&self, container: &ContainerHandle, timeout: Duration)
    -> Result<(), RuntimeError>;
    /// Delete the container and its anonymous volumes, forcing a kill if it runs.
    async fn remove(&self, container: &ContainerHandle) -> Result<(), RuntimeError>;
}
