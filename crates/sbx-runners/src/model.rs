//! `ExecutionRequest` / `ExecutionResult` / `TestOutcome` — the data model
//! shared across all three language runners (§3).

use std::collections::HashMap;

use sbx_io::Artifact;
use serde::{Deserialize, Serialize};

/// Request to run a single file or `-c`-style snippet, no project
/// structure.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeRequest {
    pub code: String,
    #[serde(default, rename = "isInputBase64")]
    pub is_input_base64: bool,
    #[serde(default, rename = "shouldOutputBase64")]
    pub should_output_base64: bool,
    #[serde(default)]
    pub input: Option<String>,
}

/// Request to run a multi-file project with a designated entry point.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRequest {
    #[serde(rename = "mainFile")]
    pub main_file: String,
    #[serde(rename = "additionalFiles", default)]
    pub additional_files: HashMap<String, String>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(rename = "runMethod", default)]
    pub run_method: Option<String>,
    #[serde(default, rename = "isInputBase64")]
    pub is_input_base64: bool,
    #[serde(default, rename = "shouldOutputBase64")]
    pub should_output_base64: bool,
    /// Java only: the fully-qualified class name carrying `main`.
    #[serde(rename = "mainClassName", default)]
    pub main_class_name: Option<String>,
}

/// Request to compile/run a project's main sources plus a test suite and
/// return normalized test outcomes.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentRequest {
    #[serde(rename = "mainFile")]
    pub main_file: String,
    #[serde(rename = "additionalFiles", default)]
    pub additional_files: HashMap<String, String>,
    #[serde(rename = "testFiles")]
    pub test_files: HashMap<String, String>,
    #[serde(rename = "runMethod", default)]
    pub run_method: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(rename = "mainClassName", default)]
    pub main_class_name: Option<String>,
}

/// Plain execution result: demuxed program output plus any artifacts
/// written under `output/`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ExecutionResult {
    pub output: String,
    #[serde(default)]
    pub files: HashMap<String, Artifact>,
}

/// One normalized test result, uniform across Python/JUnit/doctest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestOutcome {
    pub test: String,
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TestStatus {
    #[serde(rename = "SUCCESSFUL")]
    Successful,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "ABORTED")]
    Aborted,
}

/// Names used for synthetic compilation-failure outcomes (§3).
pub const MAIN_COMPILATION: &str = "MAIN_COMPILATION";
pub const TEST_COMPILATION: &str = "TEST_COMPILATION";
pub const COMPILATION: &str = "Compilation";

impl TestOutcome {
    pub fn synthetic_failure(test: impl Into<String>, exception: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            status: TestStatus::Failed,
            exception: Some(exception.into()),
        }
    }
}

/// Result of an assignment run: normalized test outcomes plus the
/// aggregate pass/fail and percent score.
#[derive(Debug, Clone, Serialize, Default)]
pub struct AssignmentResult {
    pub output: String,
    #[serde(rename = "testResults")]
    pub test_results: Vec<TestOutcome>,
    #[serde(rename = "testsPassed")]
    pub tests_passed: bool,
    pub score: u32,
}
