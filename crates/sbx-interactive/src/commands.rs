//! The in-container command-file convention (§4.4, §9): a long-lived
//! session's entry point tails a file in the bind-mounted workspace for
//! newline-delimited commands. This is an in-image convention the wire
//! protocol never exposes — a re-implementation may swap it for a direct
//! stdin protocol without changing the client-visible contract.

use std::path::Path;

use sbx_io::encode_base64;
use tokio::io::AsyncWriteExt;

use crate::error::Result;

pub const COMMAND_FILE: &str = "session-commands.log";

async fn append_line(workspace_root: &Path, line: &str) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(workspace_root.join(COMMAND_FILE))
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}

/// `upsert <name> <base64>`. `name` already carries the Java package-path
/// prefix, if any, when the caller has resolved it.
pub async fn upsert(workspace_root: &Path, name: &str, content: &[u8]) -> Result<()> {
    append_line(workspace_root, &format!("upsert {name} {}", encode_base64(content))).await
}

/// `run` (Python) or `run <FQN>` (Java).
pub async fn run(workspace_root: &Path, main_class_name: Option<&str>) -> Result<()> {
    match main_class_name {
        Some(fqn) => append_line(workspace_root, &format!("run {fqn}")).await,
        None => append_line(workspace_root, "run").await,
    }
}

/// `input <raw>`.
pub async fn input(workspace_root: &Path, raw: &str) -> Result<()> {
    append_line(workspace_root, &format!("input {raw}")).await
}
