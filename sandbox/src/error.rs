#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("sandbox provisioning failed: {0}")]
    Provisioning(String),

    #[error("sandbox not started")]
    NotStarted,

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SandboxError>;

/// Non-fatal problem hit while tearing a sandbox down.
///
/// `stop()` logs these and never returns them as errors: the local state
/// always converges to "not running" regardless of what the backend reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TeardownWarning {
    #[error("execution context already removed")]
    AlreadyRemoved,

    #[error("halt failed: {0}")]
    HaltFailed(String),

    #[error("remove failed: {0}")]
    RemoveFailed(String),
}
