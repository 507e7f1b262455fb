//! Container Lifecycle Manager: a thin typed wrapper over the
//! container-runtime API, with a process-wide state machine that makes
//! double-stop a detectable bug rather than a silent retry.

pub mod error;
pub mod registry;
pub mod runtime;
pub mod spec;

pub use error::{ContainerError, Result};
pub use registry::{ContainerRegistry, ContainerState, SandboxContainer};
pub use runtime::{AttachStream, BollardRuntime, ByteStream, ContainerId, ContainerRuntime, ExitStatus};
pub use runtime::testing;
pub use spec::{Bind, ContainerSpec, ContainerSpecBuilder};
