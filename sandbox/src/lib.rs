mod error;
mod sandbox;
mod scoped;
mod types;

pub use error::{Result, SandboxError, TeardownWarning};
pub use sandbox::Sandbox;
pub use scoped::{BoxFuture, scoped};
pub use types::ExecResult;
