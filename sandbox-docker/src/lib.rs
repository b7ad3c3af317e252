//! Container-backed implementation of the `sandbox::Sandbox` contract.
//!
//! [`DockerSandbox`] maps start/stop/execute onto four container runtime
//! operations (run, exec, stop, remove) exposed by a [`ContainerRuntime`]
//! client. [`DockerCli`] drives the `docker` command-line client;
//! [`Offloaded`] adapts blocking clients.

mod command;
pub mod config;
mod docker;
mod offload;
mod prerequisites;
mod runtime;
mod sandbox;

pub use command::{CommandError, Privilege};
pub use config::DockerSandboxConfig;
pub use docker::DockerCli;
pub use offload::{BlockingRuntime, Offloaded};
pub use prerequisites::check_prerequisites;
pub use runtime::{ContainerHandle, ContainerRuntime, ExecOutput, RunSpec, RuntimeError};
pub use crate::sandbox::DockerSandbox;
