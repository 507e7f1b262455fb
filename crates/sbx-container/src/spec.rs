//! `ContainerSpec`: the typed request a runner hands to the
//! [`crate::runtime::ContainerRuntime`] to create a sandbox container.

use std::collections::HashMap;
use std::time::Duration;

use derive_builder::Builder;
use getset::Getters;

/// A single host-path → in-container-path bind mount, read-write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind {
    pub host_path: String,
    pub container_path: String,
}

impl Bind {
    pub fn new(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
        }
    }
}

/// Describes a sandbox container to be created, per §4.2: image, argv,
/// working directory, bind mounts, runtime selector, resource caps, a
/// grace period for `stop`, and whether a TTY is attached.
#[derive(Builder, Debug, Clone, Getters)]
#[builder(pattern = "owned", setter(into))]
pub struct ContainerSpec {
    #[get = "pub"]
    /// Image reference, e.g. `DOCKER_IMAGE_PYTHON`.
    image: String,

    #[get = "pub"]
    /// The command run as the container's entry point.
    #[builder(default)]
    cmd: Vec<String>,

    #[get = "pub"]
    #[builder(default)]
    working_dir: Option<String>,

    #[get = "pub"]
    #[builder(default)]
    binds: Vec<Bind>,

    #[get = "pub"]
    /// OCI runtime selector, e.g. `runsc` for gVisor. Defaults to the
    /// daemon's own default (`runc`) when unset.
    #[builder(default)]
    runtime: Option<String>,

    #[get = "pub"]
    /// Fractional CPU limit expressed in nanoCPUs (1 core = 1_000_000_000).
    #[builder(default)]
    nano_cpus: Option<i64>,

    #[get = "pub"]
    #[builder(default)]
    memory_bytes: Option<i64>,

    #[get = "pub"]
    #[builder(default = "Duration::from_secs(1)")]
    stop_timeout: Duration,

    #[get = "pub"]
    #[builder(default)]
    tty: bool,

    #[get = "pub"]
    #[builder(default)]
    env: HashMap<String, String>,

    #[get = "pub"]
    /// Wall-clock deadline armed when the container starts. Defaults to
    /// `EXECUTION_TIME_LIMIT`'s own default of 10,000 ms (§6).
    #[builder(default = "Duration::from_millis(10_000)")]
    deadline: Duration,
}

impl ContainerSpec {
    pub fn builder() -> ContainerSpecBuilder {
        ContainerSpecBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let spec = ContainerSpec::builder().image("python:3.11").build().unwrap();
        assert_eq!(spec.stop_timeout(), &Duration::from_secs(1));
        assert_eq!(spec.deadline(), &Duration::from_millis(10_000));
        assert!(!spec.tty());
        assert!(spec.binds().is_empty());
    }

    #[test]
    fn builder_accepts_binds_and_limits() {
        let spec = ContainerSpec::builder()
            .image("openjdk:21")
            .binds(vec![Bind::new("/host/ws", "/workspace")])
            .nano_cpus(Some(800_000_000i64))
            .memory_bytes(Some(1 << 30))
            .build()
            .unwrap();
        assert_eq!(spec.binds().len(), 1);
        assert_eq!(spec.nano_cpus(), &Some(800_000_000));
    }
}
