//! Configuration for the transport shell (§6): one `#[arg(env = "...")]`
//! field per row of the spec's environment variable table, modeled on the
//! teacher's `Config` (`src/config.rs` in `containers-containrs`) and on
//! `crates/services/Cargo.toml`'s `clap` feature set.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use sbx_runners::{ImageSet, RunnerLimits};

/// The sandboxed execution engine's HTTP/WebSocket front end.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address the HTTP/WebSocket server binds to.
    #[arg(long, env = "SBX_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// The logging level of the application.
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: LevelFilter,

    /// OCI runtime selector passed to every container (e.g. `runsc` for a
    /// gVisor-class sandboxed runtime).
    #[arg(long, env = "DOCKER_RUNTIME", default_value = "runc")]
    pub docker_runtime: String,

    #[arg(long, env = "DOCKER_IMAGE_PYTHON", default_value = "python:3.11-slim")]
    pub docker_image_python: String,

    #[arg(long, env = "DOCKER_IMAGE_PYTHON_UNITTEST", default_value = "python:3.11-unittest")]
    pub docker_image_python_unittest: String,

    #[arg(long, env = "DOCKER_IMAGE_JAVA", default_value = "eclipse-temurin:17")]
    pub docker_image_java: String,

    #[arg(long, env = "DOCKER_IMAGE_JAVA_JUNIT", default_value = "eclipse-temurin:17-junit")]
    pub docker_image_java_junit: String,

    #[arg(long, env = "DOCKER_IMAGE_CPP", default_value = "gcc:13")]
    pub docker_image_cpp: String,

    #[arg(long, env = "DOCKER_IMAGE_CPP_DOCTEST", default_value = "gcc:13-doctest")]
    pub docker_image_cpp_doctest: String,

    /// Fraction of one core granted to each container.
    #[arg(long, env = "CPU_LIMIT", default_value = "0.8")]
    pub cpu_limit: f64,

    /// Suffixed byte string (`K`/`M`/`G`), parsed by `sbx_io::parse_memory_limit`.
    #[arg(long, env = "MEMORY_LIMIT", default_value = "1G")]
    pub memory_limit: String,

    /// Per-container wall-clock deadline, in milliseconds.
    #[arg(long, env = "EXECUTION_TIME_LIMIT", default_value_t = 10_000)]
    pub execution_time_limit: u64,

    /// Workspace root on the host, when the service itself runs inside a
    /// container (docker-in-docker). Defaults to the OS temp directory.
    #[arg(long, env = "HOST_TMP_DIR")]
    pub host_tmp_dir: Option<PathBuf>,
}

impl Config {
    /// The per-execution workspace root: `<HOST_TMP_DIR or OS temp>/sbx-server/`.
    pub fn workspace_root(&self) -> PathBuf {
        self.host_tmp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
            .join("sbx-server")
    }

    pub fn image_set(&self) -> ImageSet {
        ImageSet {
            python: self.docker_image_python.clone(),
            python_unittest: self.docker_image_python_unittest.clone(),
            java: self.docker_image_java.clone(),
            java_junit: self.docker_image_java_junit.clone(),
            cpp: self.docker_image_cpp.clone(),
            cpp_doctest: self.docker_image_cpp_doctest.clone(),
        }
    }

    pub fn runner_limits(&self) -> RunnerLimits {
        RunnerLimits {
            nano_cpus: (self.cpu_limit * 1_000_000_000.0) as i64,
            memory_bytes: sbx_io::parse_memory_limit(&self.memory_limit).unwrap_or(1 << 30) as i64,
            deadline: Duration::from_millis(self.execution_time_limit),
            oci_runtime: if self.docker_runtime == "runc" { None } else { Some(self.docker_runtime.clone()) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = Config::parse_from(["sbx-server"]);
        assert_eq!(config.docker_runtime, "runc");
        assert_eq!(config.cpu_limit, 0.8);
        assert_eq!(config.memory_limit, "1G");
        assert_eq!(config.execution_time_limit, 10_000);
        assert_eq!(config.log_level, LevelFilter::Warn);
    }

    #[test]
    fn runner_limits_convert_cpu_fraction_and_memory_suffix() {
        let config = Config::parse_from(["sbx-server"]);
        let limits = config.runner_limits();
        assert_eq!(limits.nano_cpus, 800_000_000);
        assert_eq!(limits.memory_bytes, 1 << 30);
    }
}
