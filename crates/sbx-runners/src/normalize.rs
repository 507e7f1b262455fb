//! Result Normalizer (§4.3.4): the cross-language abstraction everything
//! downstream consumes. Parses `test-results.json`, aggregates pass/fail
//! and percent score, and classifies a non-empty compile-error sidecar as
//! a synthetic failed test that bypasses the JUnit/doctest output
//! entirely.

use sbx_io::error::IoError;
use serde::Deserialize;

use crate::model::{AssignmentResult, TestOutcome, TestStatus, COMPILATION, MAIN_COMPILATION, TEST_COMPILATION};

#[derive(Debug, Deserialize)]
struct RawOutcome {
    test: String,
    status: TestStatus,
    #[serde(default)]
    exception: Option<String>,
}

/// Parses `test-results.json`'s raw bytes into `TestOutcome`s. The file
/// format is documented only as `{test, status, exception?}` (§9 open
/// question); unknown extra fields are ignored rather than rejected.
pub fn parse_test_results(bytes: &[u8]) -> Result<Vec<TestOutcome>, IoError> {
    let raw: Vec<RawOutcome> = serde_json::from_slice(bytes)
        .map_err(|e| IoError::Archive(format!("invalid test-results.json: {e}")))?;
    Ok(raw
        .into_iter()
        .map(|r| TestOutcome {
            test: r.test,
            status: r.status,
            exception: r.exception,
        })
        .collect())
}

/// Aggregates a list of test outcomes into `{testsPassed, score}` per the
/// spec's invariant: `score = 100 * passed / total` when `total > 0`, else
/// `0`; `testsPassed ↔ (total > 0 ∧ passed == total)`.
pub fn aggregate(outcomes: &[TestOutcome]) -> (bool, u32) {
    let total = outcomes.len();
    if total == 0 {
        return (false, 0);
    }
    let passed = outcomes
        .iter()
        .filter(|o| o.status == TestStatus::Successful)
        .count();
    let score = (100 * passed / total) as u32;
    (passed == total, score)
}

/// Builds the final `AssignmentResult` from whichever of the three
/// sources the runner collected. `compile_errors`, when non-empty,
/// bypasses `test_results` entirely: the caller passes the synthetic test
/// name appropriate to the stage that failed (`MAIN_COMPILATION`,
/// `TEST_COMPILATION`, or `Compilation`).
pub fn normalize(
    output: String,
    compile_errors: Option<(&str, String)>,
    test_results: Vec<TestOutcome>,
) -> AssignmentResult {
    if let Some((stage, diagnostics)) = compile_errors {
        debug_assert!(matches!(stage, MAIN_COMPILATION | TEST_COMPILATION | COMPILATION));
        return AssignmentResult {
            output: diagnostics.clone(),
            test_results: vec![TestOutcome::synthetic_failure(stage, diagnostics)],
            tests_passed: false,
            score: 0,
        };
    }

    let (tests_passed, score) = aggregate(&test_results);
    AssignmentResult {
        output,
        test_results,
        tests_passed,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestStatus;

    fn outcome(name: &str, status: TestStatus) -> TestOutcome {
        TestOutcome { test: name.to_string(), status, exception: None }
    }

    #[test]
    fn all_passing_scores_100() {
        let outcomes = vec![
            outcome("testGreet()", TestStatus::Successful),
            outcome("testMainOutput()", TestStatus::Successful),
        ];
        assert_eq!(aggregate(&outcomes), (true, 100));
    }

    #[test]
    fn one_failing_of_two_scores_50() {
        let outcomes = vec![
            outcome("testGreet()", TestStatus::Successful),
            outcome("testMainOutput()", TestStatus::Failed),
        ];
        assert_eq!(aggregate(&outcomes), (false, 50));
    }

    #[test]
    fn zero_tests_scores_zero_and_fails() {
        assert_eq!(aggregate(&[]), (false, 0));
    }

    #[test]
    fn compile_failure_bypasses_test_results() {
        let result = normalize(
            String::new(),
            Some((TEST_COMPILATION, "cannot find symbol: method foo()".to_string())),
            vec![outcome("testGreet()", TestStatus::Successful)],
        );
        assert_eq!(result.test_results.len(), 1);
        assert_eq!(result.test_results[0].test, TEST_COMPILATION);
        assert_eq!(result.test_results[0].status, TestStatus::Failed);
        assert_eq!(
            result.test_results[0].exception.as_deref(),
            Some("cannot find symbol: method foo()")
        );
        assert!(!result.tests_passed);
        assert_eq!(result.score, 0);
        assert!(result.output.contains("cannot find symbol"));
    }

    #[test]
    fn parses_minimal_json_schema() {
        let json = br#"[{"test":"testGreet()","status":"SUCCESSFUL"},{"test":"testBad()","status":"FAILED","exception":"AssertionError: expected <Hello, World> but was <Hello, world>"}]"#;
        let outcomes = parse_test_results(json).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].exception.as_deref(), Some("AssertionError: expected <Hello, World> but was <Hello, world>"));
    }
}
