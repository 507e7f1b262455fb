//! The shared runner skeleton (§4.3): allocate a workspace, launch a
//! container bound to it, drain its logs concurrently with waiting on it
//! (§5 — a single-task wait-then-drain implementation deadlocks against
//! the runtime's log-buffer back-pressure), and guarantee the container is
//! stopped and the workspace removed on every exit path.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use sbx_container::{ContainerId, ContainerRegistry, ContainerRuntime, ContainerSpec, ExitStatus};
use sbx_io::{Demuxer, Workspace};

use crate::error::{Result, RunnerError};

/// Everything a single request's run produced: demuxed program output and
/// how the container exited.
pub struct RunOutcome {
    pub output: String,
    pub status: ExitStatus,
}

/// Scoped resource pairing one [`Workspace`] with the [`ContainerRegistry`]
/// it launches containers through. One `RunnerContext` ↔ one request, per
/// the ownership rule of §3.
pub struct RunnerContext<R: ContainerRuntime> {
    pub workspace: Workspace,
    registry: Arc<ContainerRegistry<R>>,
}

impl<R: ContainerRuntime + 'static> RunnerContext<R> {
    pub fn new(workspace: Workspace, registry: Arc<ContainerRegistry<R>>) -> Self {
        Self { workspace, registry }
    }

    pub fn registry(&self) -> &Arc<ContainerRegistry<R>> {
        &self.registry
    }

    /// Launches `spec`, concurrently drains its demultiplexed stdio and
    /// waits for it to exit, then stops+removes it. On any failure after
    /// the container was created, best-effort stops it before
    /// propagating the error — the workspace itself is released by the
    /// caller dropping this `RunnerContext`.
    pub async fn run(&self, spec: ContainerSpec) -> Result<RunOutcome> {
        let (outcome, ()) = self.run_and_collect(spec, |_id| async {}).await?;
        Ok(outcome)
    }

    /// Like [`Self::run`], but runs `collect` after the container exits
    /// and before it is removed — the window project/assignment variants
    /// need to pull `output/` artifacts or sidecar files out via the
    /// still-present container and bind-mounted workspace.
    pub async fn run_and_collect<F, Fut, T>(&self, spec: ContainerSpec, collect: F) -> Result<(RunOutcome, T)>
    where
        F: FnOnce(ContainerId) -> Fut,
        Fut: Future<Output = T>,
    {
        let container = self
            .registry
            .launch(&spec, self.workspace.id())
            .await
            .map_err(RunnerError::Container)?;

        let logs = match self.registry.runtime().logs(&container.id).await {
            Ok(logs) => logs,
            Err(e) => {
                self.registry.stop(&container.id).await.ok();
                return Err(RunnerError::Container(e));
            }
        };

        let drain = async move {
            let mut demuxer = Demuxer::new();
            let mut stream = logs;
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => demuxer.feed(&bytes),
                    Err(_) => break,
                }
            }
            demuxer.finish()
        };

        let (output, status) = tokio::join!(drain, self.registry.wait_exit(&container));
        let status = status.map_err(RunnerError::Container)?;

        let extra = collect(container.id.clone()).await;
        self.registry.release(&container.id).await;

        Ok((RunOutcome { output, status }, extra))
    }
}
