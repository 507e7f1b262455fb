//! Sidecar-file conventions: the well-known names every assignment runner
//! reads back out of the workspace after the container exits (§3).

use std::path::Path;

pub const INPUT: &str = "input.txt";
pub const PROGRAM_OUTPUT: &str = "program_output.txt";
pub const MAIN_COMPILE_ERRORS: &str = "main_compile_errors.txt";
pub const TEST_COMPILE_ERRORS: &str = "test_compile_errors.txt";
pub const TEST_RESULTS: &str = "test-results.json";

/// Reads a sidecar file if present and non-empty, treating "missing" and
/// "empty" identically: both mean the corresponding stage produced no
/// diagnostics.
pub async fn read_non_empty(workspace_root: &Path, name: &str) -> Option<Vec<u8>> {
    match tokio::fs::read(workspace_root.join(name)).await {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        _ => None,
    }
}

pub async fn write(workspace_root: &Path, name: &str, content: &str) -> std::io::Result<()> {
    tokio::fs::write(workspace_root.join(name), content).await
}
