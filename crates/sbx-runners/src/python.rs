//! Python language runner (§4.3.1): `runCode`, `runProject`, `runAssignment`.

use std::collections::HashMap;
use std::sync::Arc;

use sbx_container::{Bind, ContainerRegistry, ContainerRuntime, ContainerSpec};
use sbx_io::{encode_base64, layout_workspace, LayoutOptions, NoopSanitizer, Workspace};

use crate::artifacts;
use crate::config::{ImageSet, RunnerLimits};
use crate::context::RunnerContext;
use crate::error::Result;
use crate::model::{AssignmentResult, ExecutionResult, TestOutcome};
use crate::normalize::{normalize, parse_test_results};
use crate::shell::shell_quote;
use crate::sidecar;

const IN_CONTAINER_WORKSPACE: &str = "/workspace";
const IN_CONTAINER_OUTPUT: &str = "/workspace/output";

/// **runCode**: `python -c "<decoded>"`. No bind mount — matches §4.3.1.
pub async fn run_code<R: ContainerRuntime + 'static>(
    registry: Arc<ContainerRegistry<R>>,
    workspace_root: &std::path::Path,
    images: &ImageSet,
    limits: &RunnerLimits,
    code: &str,
    is_input_base64: bool,
    should_output_base64: bool,
) -> Result<ExecutionResult> {
    let _ = is_input_base64; // runCode takes no stdin per §4.3.1
    let workspace = Workspace::create(workspace_root)?;
    let ctx = RunnerContext::new(workspace, registry);

    let command = format!("python3 -c {}", shell_quote(code));
    let spec = ContainerSpec::builder()
        .image(images.python.clone())
        .cmd(vec!["sh".to_string(), "-c".to_string(), command])
        .nano_cpus(Some(limits.nano_cpus))
        .memory_bytes(Some(limits.memory_bytes))
        .deadline(limits.deadline)
        .runtime(limits.oci_runtime.clone())
        .build()
        .expect("image is set");

    let outcome = ctx.run(spec).await?;
    let output = if should_output_base64 {
        encode_base64(outcome.output.as_bytes())
    } else {
        outcome.output
    };

    Ok(ExecutionResult { output, files: HashMap::new() })
}

/// **runProject**: bind-mount the workspace; entry point is `mainFile`,
/// optionally fed `input.txt` on stdin.
pub async fn run_project<R: ContainerRuntime + 'static>(
    registry: Arc<ContainerRegistry<R>>,
    workspace_root: &std::path::Path,
    images: &ImageSet,
    limits: &RunnerLimits,
    main_file: &str,
    additional_files: HashMap<String, String>,
    input: Option<&str>,
    should_output_base64: bool,
) -> Result<ExecutionResult> {
    let workspace = Workspace::create(workspace_root)?;

    let mut files = additional_files;
    files.insert(main_file.to_string(), files.remove(main_file).unwrap_or_default());

    layout_workspace(workspace.path(), files, &LayoutOptions::default(), &NoopSanitizer).await?;

    if let Some(input) = input {
        sidecar::write(workspace.path(), sidecar::INPUT, input).await?;
    }

    let redirect = if input.is_some() { format!(" < {}", sidecar::INPUT) } else { String::new() };
    let command = format!("python3 {main_file}{redirect}");

    let ctx = RunnerContext::new(workspace, registry);
    let spec = ContainerSpec::builder()
        .image(images.python.clone())
        .cmd(vec!["sh".to_string(), "-c".to_string(), command])
        .working_dir(Some(IN_CONTAINER_WORKSPACE.to_string()))
        .binds(vec![Bind::new(ctx.workspace.path().display().to_string(), IN_CONTAINER_WORKSPACE)])
        .nano_cpus(Some(limits.nano_cpus))
        .memory_bytes(Some(limits.memory_bytes))
        .deadline(limits.deadline)
        .runtime(limits.oci_runtime.clone())
        .build()
        .expect("image is set");

    let workspace_path = ctx.workspace.path().to_path_buf();
    let (outcome, files) = ctx
        .run_and_collect(spec, |container_id| async move {
            artifacts::collect(ctx.registry().runtime().as_ref(), &container_id, IN_CONTAINER_OUTPUT, &workspace_path).await
        })
        .await?;

    let output = if should_output_base64 {
        encode_base64(outcome.output.as_bytes())
    } else {
        outcome.output
    };

    Ok(ExecutionResult { output, files })
}

/// **runAssignment**: a `pyflakes .` static gate, then the program
/// (optionally invoking `run_method` on an imported module), then the
/// custom `json_test_runner.py`.
pub async fn run_assignment<R: ContainerRuntime + 'static>(
    registry: Arc<ContainerRegistry<R>>,
    workspace_root: &std::path::Path,
    images: &ImageSet,
    limits: &RunnerLimits,
    main_file: &str,
    additional_files: HashMap<String, String>,
    test_files: HashMap<String, String>,
    run_method: Option<&str>,
) -> Result<AssignmentResult> {
    let workspace = Workspace::create(workspace_root)?;

    let mut files = additional_files;
    files.extend(test_files);
    files.insert(main_file.to_string(), files.get(main_file).cloned().unwrap_or_default());

    layout_workspace(workspace.path(), files, &LayoutOptions::default(), &NoopSanitizer).await?;

    let module = main_file.trim_end_matches(".py");
    let invoke = match run_method {
        Some(method) => format!("python3 -c 'import {module}; {module}.{method}()' > {out} 2>&1", out = sidecar::PROGRAM_OUTPUT),
        None => format!("python3 {main_file} > {out} 2>&1", out = sidecar::PROGRAM_OUTPUT),
    };

    let command = format!(
        "pyflakes . > {gate} 2>&1; if [ -s {gate} ]; then exit 1; fi; {invoke}; python3 /custom-test-runner/json_test_runner.py",
        gate = sidecar::MAIN_COMPILE_ERRORS,
    );

    let ctx = RunnerContext::new(workspace, registry);
    let spec = ContainerSpec::builder()
        .image(images.python_unittest.clone())
        .cmd(vec!["sh".to_string(), "-c".to_string(), command])
        .working_dir(Some(IN_CONTAINER_WORKSPACE.to_string()))
        .binds(vec![Bind::new(ctx.workspace.path().display().to_string(), IN_CONTAINER_WORKSPACE)])
        .nano_cpus(Some(limits.nano_cpus))
        .memory_bytes(Some(limits.memory_bytes))
        .deadline(limits.deadline)
        .runtime(limits.oci_runtime.clone())
        .build()
        .expect("image is set");

    let outcome = ctx.run(spec).await?;

    if let Some(gate_errors) = sidecar::read_non_empty(ctx.workspace.path(), sidecar::MAIN_COMPILE_ERRORS).await {
        let diagnostics = String::from_utf8_lossy(&gate_errors).into_owned();
        return Ok(normalize(outcome.output, Some((crate::model::MAIN_COMPILATION, diagnostics)), Vec::new()));
    }

    let test_results: Vec<TestOutcome> = match tokio::fs::read(ctx.workspace.path().join(sidecar::TEST_RESULTS)).await {
        Ok(bytes) => parse_test_results(&bytes).unwrap_or_default(),
        Err(_) => Vec::new(),
    };

    Ok(normalize(outcome.output, None, test_results))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use sbx_container::testing::MockRuntime;
    use sbx_container::ContainerRegistry;
    use tempfile::tempdir;

    use super::*;

    fn images() -> ImageSet {
        ImageSet {
            python: "python:3.11".to_string(),
            python_unittest: "python:3.11-unittest".to_string(),
            java: "java:17".to_string(),
            java_junit: "java:17-junit".to_string(),
            cpp: "gcc:13".to_string(),
            cpp_doctest: "gcc:13-doctest".to_string(),
        }
    }

    /// One frame of the runtime's `[streamID(1)][reserved(3)][length(4)]`
    /// stdio protocol, matching what `MockRuntime::logs` replays verbatim.
    fn frame(payload: &[u8]) -> Bytes {
        let mut out = Vec::with_capacity(8 + payload.len());
        out.push(1u8);
        out.extend_from_slice(&[0, 0, 0]);
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        Bytes::from(out)
    }

    fn runtime_with_output(payload: &[u8]) -> MockRuntime {
        MockRuntime {
            log_chunks: vec![frame(payload)],
            ..MockRuntime::default()
        }
    }

    #[tokio::test]
    async fn run_code_returns_demuxed_output() {
        let registry = Arc::new(ContainerRegistry::new(Arc::new(runtime_with_output(b"Hello, World!"))));
        let root = tempdir().unwrap();

        let result = run_code(
            registry,
            root.path(),
            &images(),
            &RunnerLimits::default(),
            "print('Hello, World!')",
            false,
            false,
        )
        .await
        .unwrap();

        assert_eq!(result.output, "Hello, World!\n");
        assert!(result.files.is_empty());
    }

    #[tokio::test]
    async fn run_code_base64_encodes_output_on_request() {
        let registry = Arc::new(ContainerRegistry::new(Arc::new(runtime_with_output(b"ok"))));
        let root = tempdir().unwrap();

        let result = run_code(registry, root.path(), &images(), &RunnerLimits::default(), "print('ok')", false, true)
            .await
            .unwrap();

        assert_eq!(result.output, encode_base64(b"ok\n"));
    }

    #[tokio::test]
    async fn run_project_collects_no_artifacts_when_archive_is_empty() {
        let registry = Arc::new(ContainerRegistry::new(Arc::new(runtime_with_output(b"done"))));
        let root = tempdir().unwrap();

        let result = run_project(
            registry,
            root.path(),
            &images(),
            &RunnerLimits::default(),
            "main.py",
            HashMap::new(),
            None,
            false,
        )
        .await
        .unwrap();

        assert_eq!(result.output, "done\n");
        assert!(result.files.is_empty());
    }
}
