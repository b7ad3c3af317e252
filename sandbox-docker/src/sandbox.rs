use std::sync::Arc;

use async_trait::async_trait;
use sandbox::{ExecResult, Sandbox, SandboxError, TeardownWarning};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::DockerSandboxConfig;
use crate::runtime::{ContainerHandle, ContainerRuntime, RunSpec, RuntimeError};

/// Sandbox backed by a single container.
///
/// The runtime client is shared and injected; the container is owned and
/// present only between a successful `start` and the next `stop`.
pub struct DockerSandbox {
    config: DockerSandboxConfig,
    runtime: Arc<dyn ContainerRuntime>,
    container: Option<ContainerHandle>,
}

impl DockerSandbox {
    /// Validate `config` and build a sandbox. No runtime call is made.
    pub fn new(
        config: DockerSandboxConfig,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> sandbox::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            runtime,
            container: None,
        })
    }

    pub fn config(&self) -> &DockerSandboxConfig {
        &self.config
    }

    /// The running container, if any.
    pub fn container(&self) -> Option<&ContainerHandle> {
        self.container.as_ref()
    }

    fn run_spec(&self) -> RunSpec {
        RunSpec {
            name: format!("sandbox-{}", Uuid::new_v4()),
            image: self.config.image.clone(),
            cpu_quota: self.config.cpu_quota,
            mem_limit: self.config.mem_limit.clone(),
            network_mode: self.config.network_mode.clone(),
        }
    }

    /// Remove whatever a failed `run` may have created under `name`.
    ///
    /// `run` creates before it starts, so a start failure leaves a stopped
    /// container behind. Not-found means nothing was created.
    async fn discard_partial(&self, name: &str) {
        match self.runtime.remove(&ContainerHandle::new(name)).await {
            Ok(()) => debug!(name = %name, "cleared container left by failed start"),
            Err(RuntimeError::NotFound(_)) => {}
            Err(e) => {
                warn!(name = %name, error = %e, "failed to remove container left by failed start");
            }
        }
    }

    /// Halt and remove the container, returning what went wrong along the way.
    ///
    /// The handle is released before any runtime call, so the sandbox reads
    /// as stopped even if this future is dropped halfway.
    pub async fn teardown(&mut self) -> Vec<TeardownWarning> {
        let Some(container) = self.container.take() else {
            return Vec::new();
        };
        let mut warnings = Vec::new();

        match self
            .runtime
            .stop(&container, self.config.stop_timeout())
            .await
        {
            Ok(()) => {}
            Err(RuntimeError::NotFound(_)) => {
                warnings.push(TeardownWarning::AlreadyRemoved);
                return warnings;
            }
            // Still try to remove; removal forces a kill.
            Err(e) => warnings.push(TeardownWarning::HaltFailed(e.to_string())),
        }

        match self.runtime.remove(&container).await {
            Ok(()) => {}
            Err(RuntimeError::NotFound(_)) => warnings.push(TeardownWarning::AlreadyRemoved),
            Err(e) => warnings.push(TeardownWarning::RemoveFailed(e.to_string())),
        }

        warnings
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    fn backend(&self) -> &str {
        self.runtime.name()
    }

    fn is_running(&self) -> bool {
        self.container.is_some()
    }

    async fn start(&mut self) -> sandbox::Result<()> {
        if let Some(container) = &self.container {
            return Err(SandboxError::Provisioning(format!(
                "sandbox already started (container {container})"
            )));
        }

        let spec = self.run_spec();
        match self.runtime.run(&spec).await {
            Ok(container) => {
                info!(
                    id = %container,
                    name = %spec.name,
                    image = %spec.image,
                    cpu_quota = spec.cpu_quota,
                    mem_limit = %spec.mem_limit,
                    "sandbox started"
                );
                self.container = Some(container);
                Ok(())
            }
            Err(e) => {
                error!(image = %spec.image, error = %e, "failed to start sandbox");
                self.discard_partial(&spec.name).await;
                Err(SandboxError::Provisioning(e.to_string()))
            }
        }
    }

    async fn stop(&mut self) {
        let Some(id) = self.container.as_ref().map(ToString::to_string) else {
            return;
        };

        for warning in self.teardown().await {
            match warning {
                TeardownWarning::AlreadyRemoved => {
                    warn!(id = %id, "container not found during stop");
                }
                other => error!(id = %id, warning = %other, "error stopping container"),
            }
        }
        info!(id = %id, "sandbox stopped");
    }

    async fn execute(&self, cmd: &str) -> sandbox::Result<ExecResult> {
        let Some(container) = &self.container else {
            return Err(SandboxError::NotStarted);
        };

        let output = self.runtime.exec(container, cmd).await.map_err(|e| {
            error!(id = %container, error = %e, "failed to execute command");
            SandboxError::Execution(e.to_string())
        })?;

        debug!(id = %container, exit_code = output.exit_code, "command finished");
        Ok(ExecResult::from_streams(
            output.exit_code,
            output.stdout.as_deref(),
            output.stderr.as_deref(),
        ))
    }
}

impl Drop for DockerSandbox {
    fn drop(&mut self) {
        if let Some(container) = &self.container {
            warn!(id = %container, "sandbox dropped while running; container left behind");
        }
    }
}
