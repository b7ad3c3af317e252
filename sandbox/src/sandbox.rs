use async_trait::async_trait;

use crate::error::Result;
use crate::types::ExecResult;

/// An isolated execution context that can run shell commands.
///
/// Callers drive the lifecycle `start` → `execute`* → `stop` and serialize
/// calls on a single instance. `stop` is safe from any state and always
/// leaves the sandbox with no running context.
#[async_trait]
pub trait Sandbox: Send + Sync {
    // -- identity --
    /// Human-readable backend name (e.g. "docker").
    fn backend(&self) -> &str;
    fn is_running(&self) -> bool;

    // -- lifecycle --
    /// Provision the execution context. Fails with `Provisioning` if the
    /// backend cannot allocate or run it; the sandbox then stays unstarted.
    async fn start(&mut self) -> Result<()>;
    /// Tear the context down, best effort. Problems are logged, not returned.
    async fn stop(&mut self);

    // -- operations --
    /// Run `cmd` in the running context and wait for it to finish.
    ///
    /// Fails with `NotStarted` before `start` and with `Execution` when the
    /// backend could not invoke the command at all.
    async fn execute(&self, cmd: &str) -> Result<ExecResult>;
}
