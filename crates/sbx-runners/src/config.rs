//! Images and resource caps a runner needs, injected by the transport
//! shell from its own configuration (§6's environment variable table).
//! Runners never read the environment themselves.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ImageSet {
    pub python: String,
    pub python_unittest: String,
    pub java: String,
    pub java_junit: String,
    pub cpp: String,
    pub cpp_doctest: String,
}

#[derive(Debug, Clone)]
pub struct RunnerLimits {
    pub nano_cpus: i64,
    pub memory_bytes: i64,
    pub deadline: Duration,
    /// OCI runtime selector passed to every container spec (`DOCKER_RUNTIME`,
    /// e.g. `runsc` for a gVisor-class sandboxed runtime). `None` defers to
    /// the daemon's own default (`runc`).
    pub oci_runtime: Option<String>,
}

impl Default for RunnerLimits {
    /// Matches §6's defaults: `CPU_LIMIT=0.8`, `MEMORY_LIMIT=1G`,
    /// `EXECUTION_TIME_LIMIT=10000`, `DOCKER_RUNTIME=runc`.
    fn default() -> Self {
        Self {
            nano_cpus: 800_000_000,
            memory_bytes: 1 << 30,
            deadline: Duration::from_millis(10_000),
            oci_runtime: None,
        }
    }
}
