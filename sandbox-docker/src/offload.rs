use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::runtime::{ContainerHandle, ContainerRuntime, ExecOutput, RunSpec, RuntimeError};

/// A container runtime client whose calls block the calling thread
/// (e.g. a synchronous HTTP client talking to the daemon socket).
pub trait BlockingRuntime: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, RuntimeError>;
    fn exec(&self, container: &ContainerHandle, cmd: &str) -> Result<ExecOutput, RuntimeError>;
    fn stop(&self, container: &ContainerHandle, timeout: Duration) -> Result<(), RuntimeError>;
    fn remove(&self, container: &ContainerHandle) -> Result<(), RuntimeError>;
}

/// Adapts a `BlockingRuntime` to `ContainerRuntime` by running every call on
/// tokio's blocking pool and awaiting the result.
///
/// Calls made by one sandbox still complete in the order it awaits them.
pub struct Offloaded<R> {
    inner: Arc<R>,
}

impl<R: BlockingRuntime> Offloaded<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    async fn offload<T, F>(&self, call: F) -> Result<T, RuntimeError>
    where
        T: Send + 'static,
        F: FnOnce(&R) -> Result<T, RuntimeError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || call(&inner))
            .await
            .map_err(|e| RuntimeError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl<R: BlockingRuntime> ContainerRuntime for Offloaded<R> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, RuntimeError> {
        let spec = spec.clone();
        self.offload(move |r| r.run(&spec)).await
    }

    async fn exec(
        &self,
        container: &ContainerHandle,
        cmd: &str,
    ) -> Result<ExecOutput, RuntimeError> {
        let container = container.clone();
        let cmd = cmd.to_owned();
        self.offload(move |r| r.exec(&container, &cmd)).await
    }

    async fn stop(
        &self,
        container: &ContainerHandle,
        timeout: Duration,
    ) -> Result<(), RuntimeError> {
        let container = container.clone();
        self.offload(move |r| r.stop(&container, timeout)).await
    }

    async fn remove(&self, container: &ContainerHandle) -> Result<(), RuntimeError> {
        let container = container.clone();
        self.offload(move |r| r.remove(&container)).await
    }
}
