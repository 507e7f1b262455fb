//! Per-execution workspace: a scoped, RAII-managed directory rooted at
//! `<tmp>/<service>/<uuid>/`, bind-mounted read-write into the sandbox
//! container and recursively removed on every exit path of the runner that
//! owns it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use uuid::Uuid;

use crate::base64::decode_base64;
use crate::error::{IoError, Result};
use crate::sanitize::Sanitizer;

lazy_static! {
    static ref JAVA_PACKAGE_RE: Regex = RegexBuilder::new(
        r"^\s*package\s+([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\s*;"
    )
    .multi_line(true)
    .build()
    .expect("static java package regex is valid");
}

/// Options controlling how [`layout_workspace`] places files.
#[derive(Debug, Clone, Default)]
pub struct LayoutOptions {
    /// Decode each file's content as base64 before writing it out.
    pub base64_encoded: bool,
    /// Apply the Java package-path placement rule: files whose decoded
    /// text opens with `package X.Y.Z;` are nested under `X/Y/Z/name`
    /// instead of being placed flat.
    pub is_java: bool,
}

/// A freshly created directory rooted at `<root>/<uuid>/`, removed
/// recursively when dropped. `root` is the caller-supplied `<tmp>/<service>`
/// prefix (see `HOST_TMP_DIR` in the server configuration).
pub struct Workspace {
    dir: tempfile::TempDir,
    id: Uuid,
}

impl Workspace {
    /// Creates a new workspace directory under `root`, naming it after a
    /// freshly minted UUID so the resulting path is exactly
    /// `root/<uuid>/`.
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let id = Uuid::new_v4();
        let dir = tempfile::Builder::new()
            .prefix(&id.to_string())
            .rand_bytes(0)
            .tempdir_in(root)?;
        Ok(Self { dir, id })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The `output/` subtree a running program may write artifacts into.
    pub fn output_dir(&self) -> PathBuf {
        self.path().join("output")
    }

    pub fn sidecar_path(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }
}

/// Lays out `files` (name → content, optionally base64-encoded) under
/// `root`, applying the sanitizer and, if `opts.is_java`, the package-path
/// placement rule. All writes proceed concurrently; the first offending
/// file's error is returned, but files already written are left in place —
/// cleanup is the caller's responsibility via the owning [`Workspace`]'s
/// scope.
pub async fn layout_workspace(
    root: &Path,
    files: HashMap<String, String>,
    opts: &LayoutOptions,
    sanitizer: &(dyn Sanitizer + Sync),
) -> Result<()> {
    let writes = files.into_iter().map(|(name, content)| async move {
        validate_relative_path(&name)?;

        let bytes = if opts.base64_encoded {
            decode_base64(&content)?
        } else {
            content.into_bytes()
        };

        let bytes = sanitizer
            .sanitize(&name, bytes)
            .map_err(|reason| IoError::UnsafeSource(name.clone(), reason))?;

        let dest = if opts.is_java {
            java_destination(root, &name, &bytes)
        } else {
            root.join(&name)
        };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, &bytes).await?;
        Ok::<(), IoError>(())
    });

    futures::future::try_join_all(writes).await?;
    Ok(())
}

/// Rejects filenames that are absolute or contain a `..` segment, per the
/// `ExecutionRequest` invariant that filenames must be relative paths that
/// do not escape the workspace.
fn validate_relative_path(name: &str) -> Result<()> {
    let path = Path::new(name);
    if path.is_absolute() {
        return Err(IoError::UnsafePath(name.to_string()));
    }
    for component in path.components() {
        if matches!(component, std::path::Component::ParentDir) {
            return Err(IoError::UnsafePath(name.to_string()));
        }
    }
    Ok(())
}

/// Computes the destination path for a Java source file: if its decoded
/// text opens with a `package X.Y.Z;` declaration, the file is nested under
/// `root/X/Y/Z/name`; a missing declaration places it flat under `root`.
fn java_destination(root: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let text = String::from_utf8_lossy(bytes);
    match extract_java_package(&text) {
        Some(package) => {
            let mut dest = root.to_path_buf();
            for segment in package.split('.') {
                dest.push(segment);
            }
            dest.push(name);
            dest
        }
        None => root.join(name),
    }
}

fn extract_java_package(src: &str) -> Option<String> {
    JAVA_PACKAGE_RE
        .captures(src)
        .map(|caps| caps[1].to_string())
}

/// The package-qualified relative path a Java source file is addressed by,
/// e.g. `com/example/grading/Main.java` for a file opening with `package
/// com.example.grading;`, or just `name` when no package declaration is
/// present. Shared with the Interactive Session Coordinator, which applies
/// the same convention when upserting files into a running session.
pub fn java_qualified_name(name: &str, decoded_text: &str) -> String {
    match extract_java_package(decoded_text) {
        Some(package) => {
            let mut path = package.replace('.', "/");
            path.push('/');
            path.push_str(name);
            path
        }
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::NoopSanitizer;

    #[test]
    fn workspace_path_is_rooted_at_tmp_service_uuid() {
        let parent = tempfile::tempdir().unwrap();
        let service_root = parent.path().join("sbx-server");
        let ws = Workspace::create(&service_root).unwrap();
        assert_eq!(ws.path().parent().unwrap(), service_root);
        assert_eq!(ws.path().file_name().unwrap().to_str().unwrap(), ws.id().to_string());
        assert!(ws.path().exists());
    }

    #[test]
    fn workspace_directory_is_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let service_root = parent.path().join("sbx-server");
        let ws = Workspace::create(&service_root).unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.exists());
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn extracts_leading_package_declaration() {
        let src = "package com.example.grading;\n\npublic class Main {}\n";
        assert_eq!(extract_java_package(src), Some("com.example.grading".to_string()));
    }

    #[test]
    fn missing_package_declaration_yields_none() {
        let src = "public class Main {}\n";
        assert_eq!(extract_java_package(src), None);
    }

    #[tokio::test]
    async fn rejects_path_escaping_files() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("sbx-server");
        let ws = Workspace::create(&root).unwrap();
        let mut files = HashMap::new();
        files.insert("../escape.py".to_string(), "print(1)".to_string());
        let result = layout_workspace(ws.path(), files, &LayoutOptions::default(), &NoopSanitizer).await;
        assert!(matches!(result, Err(IoError::UnsafePath(_))));
    }

    #[tokio::test]
    async fn java_package_places_file_under_nested_directories() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("sbx-server");
        let ws = Workspace::create(&root).unwrap();
        let mut files = HashMap::new();
        files.insert(
            "Main.java".to_string(),
            "package com.example.grading;\n\npublic class Main {}\n".to_string(),
        );
        let opts = LayoutOptions { is_java: true, base64_encoded: false };
        layout_workspace(ws.path(), files, &opts, &NoopSanitizer).await.unwrap();
        assert!(ws.path().join("com/example/grading/Main.java").exists());
    }

    #[tokio::test]
    async fn missing_package_places_file_flat() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("sbx-server");
        let ws = Workspace::create(&root).unwrap();
        let mut files = HashMap::new();
        files.insert("Main.java".to_string(), "public class Main {}\n".to_string());
        let opts = LayoutOptions { is_java: true, base64_encoded: false };
        layout_workspace(ws.path(), files, &opts, &NoopSanitizer).await.unwrap();
        assert!(ws.path().join("Main.java").exists());
    }

    #[tokio::test]
    async fn concurrent_writes_all_land() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("sbx-server");
        let ws = Workspace::create(&root).unwrap();
        let mut files = HashMap::new();
        for i in 0..16 {
            files.insert(format!("file_{i}.txt"), format!("content-{i}"));
        }
        layout_workspace(ws.path(), files, &LayoutOptions::default(), &NoopSanitizer)
            .await
            .unwrap();
        for i in 0..16 {
            assert!(ws.path().join(format!("file_{i}.txt")).exists());
        }
    }
}
