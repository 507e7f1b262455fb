//! Java language runner (§4.3.2): `runCode`, `runProject`, `runAssignment`.

use std::collections::HashMap;
use std::sync::Arc;

use sbx_container::{Bind, ContainerRegistry, ContainerRuntime, ContainerSpec};
use sbx_io::{encode_base64, layout_workspace, LayoutOptions, NoopSanitizer, Workspace};

use crate::artifacts;
use crate::config::{ImageSet, RunnerLimits};
use crate::context::RunnerContext;
use crate::error::{Result, RunnerError};
use crate::model::{AssignmentResult, ExecutionResult, TestOutcome};
use crate::normalize::{normalize, parse_test_results};
use crate::sidecar;

const IN_CONTAINER_WORKSPACE: &str = "/workspace";
const IN_CONTAINER_OUTPUT: &str = "/workspace/output";

/// **runCode**: the single file is always named `Main.java`; `javac
/// Main.java && java Main`.
pub async fn run_code<R: ContainerRuntime + 'static>(
    registry: Arc<ContainerRegistry<R>>,
    workspace_root: &std::path::Path,
    images: &ImageSet,
    limits: &RunnerLimits,
    code: &str,
) -> Result<ExecutionResult> {
    let workspace = Workspace::create(workspace_root)?;
    let mut files = HashMap::new();
    files.insert("Main.java".to_string(), code.to_string());
    layout_workspace(workspace.path(), files, &LayoutOptions { base64_encoded: false, is_java: true }, &NoopSanitizer)
        .await?;

    let ctx = RunnerContext::new(workspace, registry);
    let spec = ContainerSpec::builder()
        .image(images.java.clone())
        .cmd(vec!["sh".to_string(), "-c".to_string(), "javac Main.java && java Main".to_string()])
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

/// **runProject**: `find . -name "*.java" -exec javac {} + && java -cp .
/// <mainClassFQN>`. Package-directory placement happened already at layout
/// time (§4.1).
pub async fn run_project<R: ContainerRuntime + 'static>(
    registry: Arc<ContainerRegistry<R>>,
    workspace_root: &std::path::Path,
    images: &ImageSet,
    limits: &RunnerLimits,
    main_file: &str,
    additional_files: HashMap<String, String>,
    main_class_name: &str,
    input: Option<&str>,
    should_output_base64: bool,
) -> Result<ExecutionResult> {
    let workspace = Workspace::create(workspace_root)?;

    let mut files = additional_files;
    files.insert(main_file.to_string(), files.remove(main_file).unwrap_or_default());
    layout_workspace(workspace.path(), files, &LayoutOptions { base64_encoded: false, is_java: true }, &NoopSanitizer)
        .await?;

    if let Some(input) = input {
        sidecar::write(workspace.path(), sidecar::INPUT, input).await?;
    }

    let redirect = if input.is_some() { format!(" < {}", sidecar::INPUT) } else { String::new() };
    let command = format!(
        "find . -name '*.java' -exec javac {{}} + && java -cp . {main_class_name}{redirect}",
    );

    let ctx = RunnerContext::new(workspace, registry);
    let spec = ContainerSpec::builder()
        .image(images.java.clone())
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

/// **runAssignment**: compile main sources, compile `test/` sources, run
/// the main class, then JUnit's console launcher with the
/// service-loader-registered listener that writes `test-results.json`.
/// Main and test compile errors are independent gates, each short-circuiting
/// before the next stage (§4.3.2).
#[allow(clippy::too_many_arguments)]
pub async fn run_assignment<R: ContainerRuntime + 'static>(
    registry: Arc<ContainerRegistry<R>>,
    workspace_root: &std::path::Path,
    images: &ImageSet,
    limits: &RunnerLimits,
    main_file: &str,
    additional_files: HashMap<String, String>,
    test_files: HashMap<String, String>,
    main_class_name: &str,
) -> Result<AssignmentResult> {
    let workspace = Workspace::create(workspace_root)?;

    let mut files = additional_files;
    files.insert(main_file.to_string(), files.remove(main_file).unwrap_or_default());
    layout_workspace(workspace.path(), files, &LayoutOptions { base64_encoded: false, is_java: true }, &NoopSanitizer)
        .await?;

    let test_root = workspace.path().join("test");
    tokio::fs::create_dir_all(&test_root).await.map_err(RunnerError::Io)?;
    for (name, content) in test_files {
        tokio::fs::write(test_root.join(name), content).await.map_err(RunnerError::Io)?;
    }

    let command = format!(
        "find . -maxdepth 1 -name '*.java' -o -path './*/*.java' -not -path './test/*' | xargs javac > {main_errors} 2>&1; \
         if [ -s {main_errors} ]; then exit 1; fi; \
         javac -cp .:/junit/* -d test test/*.java > {test_errors} 2>&1; \
         if [ -s {test_errors} ]; then exit 1; fi; \
         java -cp . {main_class_name} > {program_output} 2>&1; \
         java -cp .:/junit/*:test org.junit.platform.console.ConsoleLauncher --scan-classpath",
        main_errors = sidecar::MAIN_COMPILE_ERRORS,
        test_errors = sidecar::TEST_COMPILE_ERRORS,
        program_output = sidecar::PROGRAM_OUTPUT,
    );

    let ctx = RunnerContext::new(workspace, registry);
    let spec = ContainerSpec::builder()
        .image(images.java_junit.clone())
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
        let runtime = MockRuntime { log_chunks: vec![frame(b"Hello, world")], ..MockRuntime::default() };
        let registry = Arc::new(ContainerRegistry::new(Arc::new(runtime)));
        let root = tempdir().unwrap();

        let result = run_code(
            registry,
            root.path(),
            &images(),
            &RunnerLimits::default(),
            "public class Main { public static void main(String[] a) { System.out.println(\"Hello, world\"); } }",
        )
        .await
        .unwrap();

        assert_eq!(result.output, "Hello, world\n");
    }
}
