//! Process-wide wiring: the container registry and session coordinator
//! every route handler shares, plus the image set and resource caps
//! they're launched with.

use std::path::PathBuf;
use std::sync::Arc;

use sbx_container::{BollardRuntime, ContainerRegistry};
use sbx_interactive::SessionRegistry;
use sbx_runners::{ImageSet, RunnerLimits};

use crate::config::Config;

pub struct AppState {
    pub container_registry: Arc<ContainerRegistry<BollardRuntime>>,
    pub session_registry: Arc<SessionRegistry<BollardRuntime>>,
    pub workspace_root: PathBuf,
    pub images: ImageSet,
    pub limits: RunnerLimits,
}

impl AppState {
    pub fn new(config: &Config, runtime: Arc<BollardRuntime>) -> anyhow::Result<Self> {
        let workspace_root = config.workspace_root();
        std::fs::create_dir_all(&workspace_root)?;

        let container_registry = Arc::new(ContainerRegistry::new(runtime));
        let session_images = sbx_interactive::SessionImages {
            python: config.docker_image_python.clone(),
            java: config.docker_image_java.clone(),
        };
        let limits = config.runner_limits();
        let session_registry = Arc::new(SessionRegistry::with_runtime(
            container_registry.clone(),
            workspace_root.clone(),
            session_images,
            limits.deadline,
            limits.oci_runtime.clone(),
        ));

        Ok(Self {
            container_registry,
            session_registry,
            workspace_root,
            images: config.image_set(),
            limits,
        })
    }
}

pub type SharedState = Arc<AppState>;
