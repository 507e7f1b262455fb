//! Artifact collection: extracts the tar archive the container runtime
//! returns for a container's `output/` directory, enumerates the resulting
//! files, and base64-encodes them for the `ExecutionResult.files` map.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::base64::encode_base64;
use crate::error::{IoError, Result};

/// One collected artifact, ready to drop straight into an
/// `ExecutionResult.files` map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(rename = "contentB64")]
    pub content_b64: String,
}

/// Extracts `tar_stream` into `workspace_root`, then walks the resulting
/// `output/` subtree and returns every regular file found, base64-encoded
/// with an inferred mime type. A missing `output/` directory — whether
/// because the archive was empty or the program never wrote one — yields
/// an empty map; this is not an error.
pub async fn collect_artifacts<R>(tar_stream: R, workspace_root: &Path) -> Result<HashMap<String, Artifact>>
where
    R: AsyncRead + Unpin + Send,
{
    let mut archive = tokio_tar::Archive::new(tar_stream);
    let mut entries = archive
        .entries()
        .map_err(|e| IoError::Archive(e.to_string()))?;

    use futures::StreamExt;
    while let Some(entry) = entries.next().await {
        let mut entry = entry.map_err(|e| IoError::Archive(e.to_string()))?;
        let entry_path = entry
            .path()
            .map_err(|e| IoError::Archive(e.to_string()))?
            .into_owned();
        let dest = workspace_root.join(&entry_path);

        if entry.header().entry_type().is_dir() {
            tokio::fs::create_dir_all(&dest).await?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&dest).await?;
        tokio::io::copy(&mut entry, &mut file)
            .await
            .map_err(IoError::Io)?;
    }

    let output_dir = workspace_root.join("output");
    if !output_dir.exists() {
        return Ok(HashMap::new());
    }

    let mut artifacts = HashMap::new();
    collect_dir(&output_dir, &output_dir, &mut artifacts).await?;
    Ok(artifacts)
}

fn collect_dir<'a>(
    base: &'a Path,
    dir: &'a Path,
    out: &'a mut HashMap<String, Artifact>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                collect_dir(base, &path, out).await?;
            } else if file_type.is_file() {
                let bytes = tokio::fs::read(&path).await?;
                let relative = path
                    .strip_prefix(base)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");
                out.insert(
                    relative,
                    Artifact {
                        mime_type: infer_mime_type(&path).to_string(),
                        content_b64: encode_base64(&bytes),
                    },
                );
            }
        }
        Ok(())
    })
}

/// Infers a mime type from a filename's extension, falling back to
/// `application/octet-stream` for anything unrecognized.
pub fn infer_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "txt" => "text/plain",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "md" => "text/markdown",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",
        "py" => "text/x-python",
        "java" => "text/x-java-source",
        "c" => "text/x-csrc",
        "h" | "hpp" => "text/x-chdr",
        "cpp" | "cc" | "cxx" => "text/x-c++src",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_known_extensions() {
        assert_eq!(infer_mime_type(Path::new("report.json")), "application/json");
        assert_eq!(infer_mime_type(Path::new("plot.png")), "image/png");
        assert_eq!(infer_mime_type(Path::new("Main.java")), "text/x-java-source");
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        assert_eq!(infer_mime_type(Path::new("data.bin")), "application/octet-stream");
        assert_eq!(infer_mime_type(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn missing_output_directory_yields_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let empty_tar: &[u8] = &[0u8; 1024];
        let result = collect_artifacts(empty_tar, dir.path()).await.unwrap();
        assert!(result.is_empty());
    }
}
