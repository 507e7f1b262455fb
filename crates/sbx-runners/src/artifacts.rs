//! Bridges a [`sbx_container::ByteStream`] (the runtime's `getArchive` tar
//! stream) into the `AsyncRead` that `sbx_io::collect_artifacts` expects.

use std::collections::HashMap;
use std::path::Path;

use futures::TryStreamExt;
use sbx_container::{ContainerId, ContainerRuntime};
use sbx_io::Artifact;
use tokio_util::io::StreamReader;

/// Fetches the container's `output/` directory and base64-encodes
/// whatever files it contains. A missing directory — the common case when
/// a program writes nothing — yields an empty map rather than an error,
/// per §4.1.
pub async fn collect<R: ContainerRuntime>(
    runtime: &R,
    container_id: &ContainerId,
    in_container_output_path: &str,
    workspace_root: &Path,
) -> HashMap<String, Artifact> {
    let stream = match runtime.archive(container_id, in_container_output_path).await {
        Ok(stream) => stream,
        Err(_) => return HashMap::new(),
    };

    let mapped = stream.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    let reader = StreamReader::new(mapped);

    sbx_io::collect_artifacts(reader, workspace_root)
        .await
        .unwrap_or_default()
}
