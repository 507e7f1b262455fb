//! `ContainerRegistry`: the process-wide `containerID → state` map of
//! §4.2/§9, and the state machine that makes double-stop a detectable bug
//! rather than a silent retry.
//!
//! ```text
//! From        Event                    To          Action
//! —           start succeeds           Running     insert; arm deadline timer
//! Running     wait completes           (removed)   disarm timer; remove; delete entry
//! Running     deadline fires           Stopping    request stop, grace=1s
//! Running     explicit stop            Stopping    request stop, grace=1s
//! Stopping    stop returns             Stopped     remove; delete entry
//! Not Running explicit stop            (no-op)     log warning, return
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{trace, warn};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::runtime::{ContainerId, ContainerRuntime, ExitStatus};
use crate::spec::ContainerSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Stopping,
    Stopped,
}

struct Entry {
    state: ContainerState,
    deadline_timer: Option<JoinHandle<()>>,
}

/// A freshly launched container, scoped to the workspace it was started
/// for. `workspace_id` is a reference, not ownership — `ContainerRegistry`
/// does not manage workspace lifetime, only the container's.
#[derive(Debug, Clone)]
pub struct SandboxContainer {
    pub id: ContainerId,
    pub workspace_id: uuid::Uuid,
    pub deadline: Duration,
}

/// Single-writer-per-key concurrent map over container lifecycle state,
/// backed by a [`ContainerRuntime`]. One registry instance is shared
/// process-wide; every batch runner and the interactive coordinator launch
/// containers through it.
pub struct ContainerRegistry<R: ContainerRuntime> {
    runtime: Arc<R>,
    entries: RwLock<HashMap<String, Arc<Mutex<Entry>>>>,
}

impl<R: ContainerRuntime + 'static> ContainerRegistry<R> {
    pub fn new(runtime: Arc<R>) -> Self {
        Self {
            runtime,
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn entry_for(&self, id: &str) -> Arc<Mutex<Entry>> {
        if let Some(existing) = self.entries.read().await.get(id) {
            return existing.clone();
        }
        let mut entries = self.entries.write().await;
        entries
            .entry(id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Entry {
                    state: ContainerState::Running,
                    deadline_timer: None,
                }))
            })
            .clone()
    }

    /// Creates and starts a container for `spec`, registers it as
    /// `Running`, and arms its wall-clock deadline. On deadline expiry the
    /// container is force-stopped via the same path as an explicit
    /// `stop()` call.
    pub async fn launch(
        self: &Arc<Self>,
        spec: &ContainerSpec,
        workspace_id: uuid::Uuid,
    ) -> Result<SandboxContainer> {
        let id = self.runtime.create(spec).await?;
        self.runtime.start(&id).await?;

        let entry = self.entry_for(id.as_str()).await;
        {
            let mut guard = entry.lock().await;
            guard.state = ContainerState::Running;
        }
        trace!("container {id} transitioned to Running");

        let deadline = *spec.deadline();
        let registry = self.clone();
        let timer_id = id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            registry.stop(&timer_id).await.ok();
        });
        entry.lock().await.deadline_timer = Some(timer);

        Ok(SandboxContainer {
            id,
            workspace_id,
            deadline,
        })
    }

    /// Blocks until the container exits, disarms its deadline timer, and
    /// removes it from both the runtime and the registry. Per §8, the
    /// container's state must never be `Running` after this returns.
    pub async fn wait(&self, container: &SandboxContainer) -> Result<ExitStatus> {
        let status = self.wait_exit(container).await?;
        self.remove(&container.id).await;
        Ok(status)
    }

    /// Blocks until the container exits and disarms its deadline timer,
    /// but does not remove it yet — used by callers (e.g. artifact
    /// collection) that need the container to still exist on exit before
    /// calling [`Self::release`].
    pub async fn wait_exit(&self, container: &SandboxContainer) -> Result<ExitStatus> {
        let status = self.runtime.wait(&container.id).await?;

        let entry = self.entry_for(container.id.as_str()).await;
        {
            let mut guard = entry.lock().await;
            if let Some(timer) = guard.deadline_timer.take() {
                timer.abort();
            }
        }

        Ok(status)
    }

    /// Removes an exited container from the runtime and registry. Safe to
    /// call even if the container was already removed.
    pub async fn release(&self, id: &ContainerId) {
        self.remove(id).await;
    }

    /// Idempotent stop. Per §4.2: only a `Running → Stopping` transition
    /// may issue a stop request; a container the registry does not know
    /// about, or one already `Stopping`/`Stopped`, is a logged no-op.
    pub async fn stop(&self, id: &ContainerId) -> Result<()> {
        let existing = {
            let entries = self.entries.read().await;
            entries.get(id.as_str()).cloned()
        };

        let Some(entry) = existing else {
            warn!("stop requested for unknown container {id}; no-op");
            return Ok(());
        };

        {
            let mut guard = entry.lock().await;
            match guard.state {
                ContainerState::Running => {
                    guard.state = ContainerState::Stopping;
                }
                ContainerState::Stopping | ContainerState::Stopped => {
                    warn!("double-stop guard: container {id} already {:?}; no-op", guard.state);
                    return Ok(());
                }
            }
        }

        self.runtime.stop(id, Duration::from_secs(1)).await?;

        {
            let mut guard = entry.lock().await;
            guard.state = ContainerState::Stopped;
            if let Some(timer) = guard.deadline_timer.take() {
                timer.abort();
            }
        }

        self.remove(id).await;
        Ok(())
    }

    /// Removes the container from the runtime and, only on success,
    /// deletes its registry entry.
    async fn remove(&self, id: &ContainerId) {
        if let Err(e) = self.runtime.remove(id).await {
            warn!("failed to remove container {id}: {e}");
            return;
        }
        self.entries.write().await.remove(id.as_str());
    }

    pub async fn state(&self, id: &ContainerId) -> Option<ContainerState> {
        let entries = self.entries.read().await;
        let entry = entries.get(id.as_str())?;
        Some(entry.lock().await.state)
    }

    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::MockRuntime;

    fn spec() -> ContainerSpec {
        ContainerSpec::builder().image("python:3.11").build().unwrap()
    }

    #[tokio::test]
    async fn launch_registers_running_then_wait_removes_entry() {
        let runtime = Arc::new(MockRuntime::default());
        let registry = Arc::new(ContainerRegistry::new(runtime));
        let container = registry.launch(&spec(), uuid::Uuid::new_v4()).await.unwrap();
        assert_eq!(registry.state(&container.id).await, Some(ContainerState::Running));

        registry.wait(&container).await.unwrap();
        assert_eq!(registry.state(&container.id).await, None);
    }

    #[tokio::test]
    async fn double_stop_is_a_noop() {
        let runtime = Arc::new(MockRuntime::default());
        let registry = Arc::new(ContainerRegistry::new(runtime));
        let container = registry.launch(&spec(), uuid::Uuid::new_v4()).await.unwrap();

        registry.stop(&container.id).await.unwrap();
        assert_eq!(registry.state(&container.id).await, None);

        // Second stop targets an id no longer in the map: no-op, no error.
        registry.stop(&container.id).await.unwrap();
    }

    #[tokio::test]
    async fn stop_on_unknown_container_is_a_noop() {
        let runtime = Arc::new(MockRuntime::default());
        let registry = Arc::new(ContainerRegistry::new(runtime));
        let id = ContainerId("never-launched".to_string());
        registry.stop(&id).await.unwrap();
    }
}
