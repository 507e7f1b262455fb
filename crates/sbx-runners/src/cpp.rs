//! C++ language runner (§4.3.3): `runCode`, `runProject`, `runAssignment`.

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
use crate::sidecar;

const IN_CONTAINER_WORKSPACE: &str = "/workspace";
const IN_CONTAINER_OUTPUT: &str = "/workspace/output";

/// **runCode**: the snippet is always `main.cpp`; `g++ -o main main.cpp &&
/// ./main`.
pub async fn run_code<R: ContainerRuntime + 'static>(
    registry: Arc<ContainerRegistry<R>>,
    workspace_root: &std::path::Path,
    images: &ImageSet,
    limits: &RunnerLimits,
    code: &str,
) -> Result<ExecutionResult> {
    let workspace = Workspace::create(workspace_root)?;
    let mut files = HashMap::new();
    files.insert("main.cpp".to_string(), code.to_string());
    layout_workspace(workspace.path(), files, &LayoutOptions::default(), &NoopSanitizer).await?;

    let ctx = RunnerContext::new(workspace, registry);
    let spec = ContainerSpec::builder()
        .image(images.cpp.clone())
        .cmd(vec!["sh".to_string(), "-c".to_string(), "g++ -o main main.cpp && ./main".to_string()])
        .working_dir(Some(IN_CONTAINER_WORKSPACE.to_string()))
        .binds(vec![Bind::new(ctx.workspace.path().display().to_string(), IN_CONTAINER_WORKSPACE)])
        .nano_cpus(Some(limits.nano_cpus))
        .memory_bytes(Some(limits.memory_bytes))
        .deadline(limits.deadline)
        .runtime(limits.oci_runtime.clone())
        .build()
        .expect("image is set");

    let outcome = ctx.run(spec).await?;
    Ok(ExecutionResult { output: outcome.output, files: HashMap::new() })
}

/// **runProject**: `mainFile` plus every additional `.cpp` file compiled
/// together into `./main`, executed with the optional stdin redirect.
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
    let sources: Vec<String> = files.keys().filter(|n| n.ends_with(".cpp")).cloned().collect();
    layout_workspace(workspace.path(), files, &LayoutOptions::default(), &NoopSanitizer).await?;

    if let Some(input) = input {
        sidecar::write(workspace.path(), sidecar::INPUT, input).await?;
    }

    let redirect = if input.is_some() { format!(" < {}", sidecar::INPUT) } else { String::new() };
    let command = format!("g++ -o main {} && ./main{redirect}", sources.join(" "));

    let ctx = RunnerContext::new(workspace, registry);
    let spec = ContainerSpec::builder()
        .image(images.cpp.clone())
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

    let output = if should_output_base64 { encode_base64(outcome.output.as_bytes()) } else { outcome.output };
    Ok(ExecutionResult { output, files })
}

/// **runAssignment**: compile the program sources to `program`, run it,
/// then compile `test.cpp` linked against the program's object units and
/// run it with doctest's `-r json` reporter (the image's custom
/// `JsonReporter`), which writes `test-results.json` (§4.3.3).
pub async fn run_assignment<R: ContainerRuntime + 'static>(
    registry: Arc<ContainerRegistry<R>>,
    workspace_root: &std::path::Path,
    images: &ImageSet,
    limits: &RunnerLimits,
    main_file: &str,
    additional_files: HashMap<String, String>,
    test_files: HashMap<String, String>,
) -> Result<AssignmentResult> {
    let workspace = Workspace::create(workspace_root)?;

    let mut files = additional_files;
    files.insert(main_file.to_string(), files.remove(main_file).unwrap_or_default());
    let program_sources: Vec<String> = files.keys().filter(|n| n.ends_with(".cpp")).cloned().collect();
    layout_workspace(workspace.path(), files, &LayoutOptions::default(), &NoopSanitizer).await?;

    for (name, content) in &test_files {
        tokio::fs::write(workspace.path().join(name), content).await?;
    }
    let test_sources: Vec<String> = test_files.keys().filter(|n| n.ends_with(".cpp")).cloned().collect();

    let command = format!(
        "g++ -o program {program_sources} 2> {compile_errors}; if [ -s {compile_errors} ]; then exit 1; fi; \
         ./program > {program_output} 2>&1; \
         g++ -o test {test_sources} {program_objects} 2> {test_errors}; if [ -s {test_errors} ]; then exit 1; fi; \
         ./test -r json -o={test_results}",
        program_sources = program_sources.join(" "),
        compile_errors = sidecar::MAIN_COMPILE_ERRORS,
        program_output = sidecar::PROGRAM_OUTPUT,
        test_sources = test_sources.join(" "),
        program_objects = program_sources.iter().filter(|n| n.as_str() != main_file).cloned().collect::<Vec<_>>().join(" "),
        test_errors = sidecar::TEST_COMPILE_ERRORS,
        test_results = sidecar::TEST_RESULTS,
    );

    let ctx = RunnerContext::new(workspace, registry);
    let spec = ContainerSpec::builder()
        .image(images.cpp_doctest.clone())
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

    if let Some(errors) = sidecar::read_non_empty(ctx.workspace.path(), sidecar::MAIN_COMPILE_ERRORS).await {
        let diagnostics = String::from_utf8_lossy(&errors).into_owned();
        return Ok(normalize(outcome.output, Some((crate::model::MAIN_COMPILATION, diagnostics)), Vec::new()));
    }
    if let Some(errors) = sidecar::read_non_empty(ctx.workspace.path(), sidecar::TEST_COMPILE_ERRORS).await {
        let diagnostics = String::from_utf8_lossy(&errors).into_owned();
        return Ok(normalize(outcome.output, Some((crate::model::TEST_COMPILATION, diagnostics)), Vec::new()));
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
            java: "eclipse-temurin:17".to_string(),
            java_junit: "eclipse-temurin:17-junit".to_string(),
            cpp: "gcc:13".to_string(),
            cpp_doctest: "gcc:13-doctest".to_string(),
        }
    }

    fn frame(payload: &[u8]) -> Bytes {
        let mut out = Vec::with_capacity(8 + payload.len());
        out.push(1u8);
        out.extend_from_slice(&[0, 0, 0]);
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        Bytes::from(out)
    }

    #[tokio::test]
    async fn run_code_returns_demuxed_output() {
        let runtime = MockRuntime { log_chunks: vec![frame(b"hi")], ..MockRuntime::default() };
        let registry = Arc::new(ContainerRegistry::new(Arc::new(runtime)));
        let root = tempdir().unwrap();

        let result = run_code(
            registry,
            root.path(),
            &images(),
            &RunnerLimits::default(),
            "#include <iostream>\nint main(){std::cout<<\"hi\";}",
        )
        .await
        .unwrap();

        assert_eq!(result.output, "hi\n");
    }
}
