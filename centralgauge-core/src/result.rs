//! Outcome types produced by the agent executor, sandbox analyzer, and
//! verification engine. Every fallible operation in this crate family
//! returns one of these instead of propagating an error up through the
//! caller.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cost::CostMetrics;
use crate::ids::{Difficulty, ExecutionId, TaskId};

/// Why an agent execution loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Success,
    MaxTurns,
    MaxTokens,
    MaxCompileAttempts,
    TestFailure,
    Timeout,
    Error,
}

/// The phase in which a non-success outcome occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    ContainerStartup,
    McpConnection,
    AgentExecution,
    Compilation,
    TestExecution,
    Timeout,
    Unknown,
}

/// One extracted compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationError {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub code: String,
    pub message: String,
}

/// Aggregate test-run statistics plus any named failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: u32,
    pub total: u32,
    #[serde(default)]
    pub failures: Vec<TestFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    pub name: String,
    pub message: String,
}

/// A compact, parsed view of the agent's terminal output, independent of
/// the exact phrasing the agent used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub compile_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests_passed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests_total: Option<u32>,
    pub result: PassFail,
    pub formatted: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassFail {
    Pass,
    Fail,
}

impl ResultSummary {
    pub fn compile_only(compile_success: bool) -> Self {
        let result = if compile_success { PassFail::Pass } else { PassFail::Fail };
        let formatted = format!(
            "Compile: {}\nResult: {}",
            if compile_success { "Success" } else { "Failed" },
            if compile_success { "Pass" } else { "Fail" },
        );
        Self { compile_success, tests_passed: None, tests_total: None, result, formatted }
    }

    pub fn with_tests(compile_success: bool, passed: u32, total: u32) -> Self {
        let passing = compile_success && passed == total && total > 0;
        let result = if passing { PassFail::Pass } else { PassFail::Fail };
        let formatted = format!(
            "Compile: {}\nTests: {}/{}\nResult: {}",
            if compile_success { "Success" } else { "Failed" },
            passed,
            total,
            if passing { "Pass" } else { "Fail" },
        );
        Self {
            compile_success,
            tests_passed: Some(passed),
            tests_total: Some(total),
            result,
            formatted,
        }
    }
}

/// Detailed, structured diagnosis of a non-success termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedFailureReason {
    pub termination_reason: TerminationReason,
    pub phase: FailurePhase,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compilation: Option<Vec<CompilationError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<TestOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    pub failed_at: DateTime<Utc>,
}

/// The terminal report of one `AgentExecutor::execute` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecutionResult {
    pub task_id: TaskId,
    pub agent_id: String,
    pub execution_id: ExecutionId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_code: Option<String>,
    pub turns: usize,
    pub metrics: CostMetrics,
    pub termination_reason: TerminationReason,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub executed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_result: Option<TestOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<ResultSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_details: Option<DetailedFailureReason>,
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u128(value.as_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// What the debug-log parser found for one `(taskId, model)` pair that did
/// not end in an eventual success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailingTask {
    pub task_id: TaskId,
    pub difficulty: Difficulty,
    pub failure_type: FailureType,
    pub model: String,
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compilation_errors: Option<Vec<CompilationError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_results: Option<TestOutcome>,
    pub output: String,
    pub task_yaml_path: PathBuf,
    pub test_al_path: PathBuf,
    pub generated_code_path: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    Compilation,
    Test,
}

/// The category assigned to a benchmark-side defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixCategory {
    IdConflict,
    SyntaxError,
    TestLogicBug,
    TaskDefinitionIssue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffectedFileType {
    TaskYaml,
    TestAl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedFix {
    pub file_type: AffectedFileType,
    pub file_path: PathBuf,
    pub description: String,
    pub code_before: String,
    pub code_after: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// A classified failure: either something wrong with the benchmark task
/// itself, or a gap in the model's AL knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisResult {
    Fixable {
        category: FixCategory,
        description: String,
        fix: ProposedFix,
        confidence: Confidence,
    },
    ModelShortcoming {
        concept: String,
        al_concept: String,
        description: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
        generated_code: String,
        correct_pattern: String,
        confidence: Confidence,
    },
}

impl AnalysisResult {
    /// The low-confidence fallback emitted when the analysis LLM's
    /// response could not be parsed as JSON.
    pub fn parse_failure(generated_code: impl Into<String>) -> Self {
        AnalysisResult::ModelShortcoming {
            concept: "parse-failure".to_string(),
            al_concept: "parse-failure".to_string(),
            description: "Analysis response was not valid JSON".to_string(),
            error_code: None,
            generated_code: generated_code.into(),
            correct_pattern: String::new(),
            confidence: Confidence::Low,
        }
    }
}

/// One deduplicated gap in a model's AL knowledge, persisted in a
/// per-model shortcomings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcomingEntry {
    pub concept: String,
    pub al_concept: String,
    pub description: String,
    pub correct_pattern: String,
    pub incorrect_pattern: String,
    pub error_codes: Vec<String>,
    pub affected_tasks: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub occurrences: u32,
}

/// The persisted, per-model shortcomings catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcomingsFile {
    pub model: String,
    pub last_updated: DateTime<Utc>,
    pub shortcomings: Vec<ShortcomingEntry>,
}

impl ShortcomingsFile {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), last_updated: Utc::now(), shortcomings: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_only_summary_formats_pass_and_fail() {
        let pass = ResultSummary::compile_only(true);
        assert_eq!(pass.result, PassFail::Pass);
        assert_eq!(pass.formatted, "Compile: Success\nResult: Pass");

        let fail = ResultSummary::compile_only(false);
        assert_eq!(fail.result, PassFail::Fail);
        assert_eq!(fail.formatted, "Compile: Failed\nResult: Fail");
    }

    #[test]
    fn with_tests_summary_requires_full_pass() {
        let partial = ResultSummary::with_tests(true, 3, 7);
        assert_eq!(partial.result, PassFail::Fail);
        assert_eq!(partial.tests_passed, Some(3));
        assert_eq!(partial.tests_total, Some(7));

        let full = ResultSummary::with_tests(true, 7, 7);
        assert_eq!(full.result, PassFail::Pass);
    }

    #[test]
    fn with_tests_summary_fails_when_compile_failed_even_if_counts_match() {
        let summary = ResultSummary::with_tests(false, 7, 7);
        assert_eq!(summary.result, PassFail::Fail);
    }

    #[test]
    fn parse_failure_is_low_confidence_model_shortcoming() {
        let result = AnalysisResult::parse_failure("garbage");
        match result {
            AnalysisResult::ModelShortcoming { concept, confidence, .. } => {
                assert_eq!(concept, "parse-failure");
                assert_eq!(confidence, Confidence::Low);
            }
            AnalysisResult::Fixable { .. } => panic!("expected ModelShortcoming"),
        }
    }
}
