//! Error taxonomy for the Container Lifecycle Manager.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContainerError>;

#[derive(Error, Debug)]
pub enum ContainerError {
    /// Create/start was rejected by the container runtime.
    #[error("container launch failed: {0}")]
    LaunchFailure(String),

    /// A stop/wait/inspect/logs/attach RPC against the runtime failed.
    #[error("container runtime error: {0}")]
    Runtime(String),

    /// `stop` was called against a container the registry does not know
    /// about. Per §4.2 this is logged and treated as a no-op, never
    /// surfaced to the caller as an error, but the registry exposes it so
    /// callers that care can observe it.
    #[error("container {0} not found in registry")]
    NotFound(String),
}
