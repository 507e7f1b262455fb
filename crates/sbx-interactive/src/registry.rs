//! `SessionRegistry`: the process-wide `sessionID → Session` map (§4.4),
//! the single-writer-per-key concurrent map style [`ContainerRegistry`]
//! already uses, keyed by session instead of container.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::warn;
use sbx_container::{Bind, ContainerRegistry, ContainerRuntime, ContainerSpec};
use sbx_io::{java_qualified_name, Workspace};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ansi::strip_csi;
use crate::commands;
use crate::error::{InteractiveError, Result};
use crate::session::{Language, Session, SessionImages};

const IN_CONTAINER_WORKSPACE: &str = "/workspace";

/// Coordinates session creation and teardown over a shared map. Readers
/// (attach) may run concurrently with each other; each session's entry is
/// only ever removed by the `disconnect` path, and only once.
pub struct SessionRegistry<R: ContainerRuntime> {
    container_registry: Arc<ContainerRegistry<R>>,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    workspace_root: std::path::PathBuf,
    images: SessionImages,
    deadline: Duration,
    oci_runtime: Option<String>,
}

impl<R: ContainerRuntime + 'static> SessionRegistry<R> {
    pub fn new(
        container_registry: Arc<ContainerRegistry<R>>,
        workspace_root: impl Into<std::path::PathBuf>,
        images: SessionImages,
        deadline: Duration,
    ) -> Self {
        Self::with_runtime(container_registry, workspace_root, images, deadline, None)
    }

    /// Like [`Self::new`], additionally pinning every session container to
    /// `oci_runtime` (`DOCKER_RUNTIME`, e.g. `runsc`).
    pub fn with_runtime(
        container_registry: Arc<ContainerRegistry<R>>,
        workspace_root: impl Into<std::path::PathBuf>,
        images: SessionImages,
        deadline: Duration,
        oci_runtime: Option<String>,
    ) -> Self {
        Self {
            container_registry,
            sessions: RwLock::new(HashMap::new()),
            workspace_root: workspace_root.into(),
            images,
            deadline,
            oci_runtime,
        }
    }

    /// Allocates a workspace and starts a long-lived, TTY-attached
    /// container whose entry point tails the session's command file.
    /// Registers it under a freshly minted sessionID.
    pub async fn create_session(&self, language: Language) -> Result<Uuid> {
        let workspace = Workspace::create(&self.workspace_root)?;

        let image = match language {
            Language::Python => self.images.python.clone(),
            Language::Java => self.images.java.clone(),
        };

        let spec = ContainerSpec::builder()
            .image(image)
            .working_dir(Some(IN_CONTAINER_WORKSPACE.to_string()))
            .binds(vec![Bind::new(workspace.path().display().to_string(), IN_CONTAINER_WORKSPACE)])
            .tty(true)
            .deadline(self.deadline)
            .runtime(self.oci_runtime.clone())
            .build()
            .expect("image is set");

        let container = self.container_registry.launch(&spec, workspace.id()).await?;
        let id = Uuid::new_v4();

        let session = Arc::new(Session { container, workspace, language });
        self.sessions.write().await.insert(id, session);
        Ok(id)
    }

    async fn session(&self, session_id: Uuid) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(InteractiveError::SessionNotFound(session_id))
    }

    /// Returns the container's bidirectional attach stream, output already
    /// stripped of ANSI CSI sequences is the caller's responsibility — this
    /// method hands back the raw stream; transports read it through
    /// [`strip_csi`] before forwarding.
    pub async fn attach(&self, session_id: Uuid) -> Result<sbx_container::AttachStream> {
        let session = self.session(session_id).await?;
        Ok(self.container_registry.runtime().attach(&session.container.id).await?)
    }

    /// `upsertFiles(files, isJava)`: writes one `upsert name b64content`
    /// line per file. Java files are addressed by their package-qualified
    /// path, derived the same way the batch layout does.
    pub async fn upsert_files(&self, session_id: Uuid, files: HashMap<String, String>, is_java: bool) -> Result<()> {
        let session = self.session(session_id).await?;
        for (name, content) in files {
            let bytes = content.into_bytes();
            let qualified = if is_java {
                java_qualified_name(&name, &String::from_utf8_lossy(&bytes))
            } else {
                name
            };
            commands::upsert(session.workspace.path(), &qualified, &bytes).await?;
        }
        Ok(())
    }

    /// `startProgram({language, mainClassName?})`. Java requires
    /// `main_class_name`; its absence is `BadCommand` (§7).
    pub async fn start_program(&self, session_id: Uuid, main_class_name: Option<&str>) -> Result<()> {
        let session = self.session(session_id).await?;
        if session.language == Language::Java && main_class_name.is_none() {
            return Err(InteractiveError::BadCommand("Java startProgram requires mainClassName".into()));
        }
        commands::run(session.workspace.path(), main_class_name).await
    }

    /// `sendInput(text)`.
    pub async fn send_input(&self, session_id: Uuid, text: &str) -> Result<()> {
        let session = self.session(session_id).await?;
        commands::input(session.workspace.path(), text).await
    }

    /// `disconnect`: stop and remove the container, delete the session
    /// entry, and let the dropped `Session` remove the workspace.
    pub async fn disconnect(&self, session_id: Uuid) -> Result<()> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(&session_id).ok_or(InteractiveError::SessionNotFound(session_id))?
        };
        if let Err(e) = self.container_registry.stop(&session.container.id).await {
            warn!("failed to stop session {session_id}'s container: {e}");
            return Err(e.into());
        }
        Ok(())
    }
}

/// Strips ANSI CSI sequences from a chunk of the container's TTY output
/// before a transport forwards it to the client (§4.4).
pub fn forward_text(raw: &str) -> String {
    strip_csi(raw)
}

#[cfg(test)]
mod tests {
    use sbx_container::testing::MockRuntime;

    use super::*;

    fn images() -> SessionImages {
        SessionImages { python: "python:3.11-interactive".to_string(), java: "eclipse-temurin:17-interactive".to_string() }
    }

    fn registry() -> (SessionRegistry<MockRuntime>, tempfile::TempDir) {
        let root = tempfile::tempdir().unwrap();
        let container_registry = Arc::new(ContainerRegistry::new(Arc::new(MockRuntime::default())));
        let registry = SessionRegistry::new(container_registry, root.path(), images(), Duration::from_secs(10));
        (registry, root)
    }

    #[tokio::test]
    async fn create_session_registers_a_lookup_able_session() {
        let (registry, _root) = registry();
        let id = registry.create_session(Language::Python).await.unwrap();
        assert!(registry.session(id).await.is_ok());
    }

    #[tokio::test]
    async fn attach_on_unknown_session_is_not_found() {
        let (registry, _root) = registry();
        let err = registry.attach(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, InteractiveError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn java_start_program_without_class_name_is_bad_command() {
        let (registry, _root) = registry();
        let id = registry.create_session(Language::Java).await.unwrap();
        let err = registry.start_program(id, None).await.unwrap_err();
        assert!(matches!(err, InteractiveError::BadCommand(_)));
    }

    #[tokio::test]
    async fn python_start_program_without_class_name_succeeds() {
        let (registry, _root) = registry();
        let id = registry.create_session(Language::Python).await.unwrap();
        registry.start_program(id, None).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_files_places_java_source_under_package_path() {
        let (registry, _root) = registry();
        let id = registry.create_session(Language::Java).await.unwrap();
        let mut files = HashMap::new();
        files.insert("Main.java".to_string(), "package com.example;\npublic class Main {}\n".to_string());
        registry.upsert_files(id, files, true).await.unwrap();

        let session = registry.session(id).await.unwrap();
        let log = tokio::fs::read_to_string(session.workspace.path().join(commands::COMMAND_FILE)).await.unwrap();
        assert!(log.starts_with("upsert com/example/Main.java "));
    }

    #[tokio::test]
    async fn disconnect_removes_the_session_and_rejects_a_second_call() {
        let (registry, _root) = registry();
        let id = registry.create_session(Language::Python).await.unwrap();
        registry.disconnect(id).await.unwrap();
        assert!(matches!(registry.disconnect(id).await, Err(InteractiveError::SessionNotFound(_))));
    }
}
