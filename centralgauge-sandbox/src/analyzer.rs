//! Turns unstructured container/tool output into a structured
//! `SandboxOutputAnalysis`. Pure functions only: no I/O, no process state.
//! Shared by the sandbox executor (over container stdio) and the agent
//! executor's non-success classification path (over aggregated tool
//! output), so it lives in its own module with no upward dependency on
//! either caller.

use std::sync::OnceLock;

use centralgauge_core::{
    CompilationError, DetailedFailureReason, FailurePhase, TerminationReason, TestFailure,
    TestOutcome,
};
use chrono::Utc;
use regex::Regex;

fn compile_error_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([^(\n]+)\((\d+),(\d+)\):\s*error\s+(AL\d+):\s*(.+)$").expect("valid regex")
    })
}

fn generic_error_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^ERROR:\s*(.+)$").expect("valid regex"))
}

fn app_generation_failed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"App generation failed").expect("valid regex"))
}

fn test_stats_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)/(\d+)\s+(?:tests?\s+)?passed").expect("valid regex")
    })
}

fn test_failure_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Testfunction\s+(\S+)\s+Failure").expect("valid regex"))
}

fn test_failure_message_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Testfunction\s+(\S+)\s+.*?(?:Error|Exception):\s*(.+)").expect("valid regex")
    })
}

fn compile_failed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)compile:\s*failed|compilation failed").expect("valid regex"))
}

fn compile_status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)compile:\s*(success|failed)").expect("valid regex"))
}

fn structured_result_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)result:\s*(pass|fail)").expect("valid regex"))
}

fn container_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)container").expect("valid regex")
    })
}

fn failure_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)failed to start|could not start|startup failed").expect("valid regex"))
}

fn max_turns_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)max turns").expect("valid regex"))
}

/// Extract every `File(line,col): error ALxxxx: message` diagnostic, plus
/// bare `ERROR: ...` lines (assigned the placeholder code `AL0000`,
/// deduplicated by message), plus an `App generation failed` fallback
/// entry if that literal string appears anywhere.
pub fn extract_compilation_errors(output: &str) -> Vec<CompilationError> {
    let mut errors = Vec::new();
    for caps in compile_error_re().captures_iter(output) {
        errors.push(CompilationError {
            file: caps[1].trim().to_string(),
            line: caps[2].parse().unwrap_or(0),
            column: caps[3].parse().unwrap_or(0),
            code: caps[4].to_string(),
            message: caps[5].trim().to_string(),
        });
    }

    let mut seen_generic = std::collections::HashSet::new();
    for caps in generic_error_line_re().captures_iter(output) {
        let message = caps[1].trim().to_string();
        if seen_generic.insert(message.clone()) {
            errors.push(CompilationError {
                file: String::new(),
                line: 0,
                column: 0,
                code: "AL0000".to_string(),
                message,
            });
        }
    }

    if app_generation_failed_re().is_match(output)
        && !errors.iter().any(|e| e.message.contains("App generation failed"))
    {
        errors.push(CompilationError {
            file: String::new(),
            line: 0,
            column: 0,
            code: "AL0000".to_string(),
            message: "App generation failed".to_string(),
        });
    }

    errors
}

/// Extract the first `<passed>/<total>[ tests] passed` pair.
pub fn extract_test_stats(output: &str) -> Option<(u32, u32)> {
    let caps = test_stats_re().captures(output)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Extract named test failures: a first pass collects failure names from
/// `Testfunction X Failure` lines, a second pass merges in
/// `Testfunction X ... (Error|Exception): message` for matching names
/// (creating new entries when a message-only line names a function the
/// first pass missed). If the test stats show `passed < total` but no
/// named failures were found, synthesize placeholder entries so the
/// count matches.
pub fn extract_test_failures(output: &str, stats: Option<(u32, u32)>) -> Vec<TestFailure> {
    let mut order: Vec<String> = Vec::new();
    let mut messages: std::collections::HashMap<String, String> = std::collections::HashMap::new();

    for caps in test_failure_name_re().captures_iter(output) {
        let name = caps[1].to_string();
        if !messages.contains_key(&name) {
            order.push(name.clone());
            messages.insert(name, String::new());
        }
    }

    for caps in test_failure_message_re().captures_iter(output) {
        let name = caps[1].to_string();
        let message = caps[2].trim().to_string();
        if !messages.contains_key(&name) {
            order.push(name.clone());
        }
        messages.insert(name, message);
    }

    let mut failures: Vec<TestFailure> = order
        .into_iter()
        .map(|name| {
            let message = messages.remove(&name).unwrap_or_default();
            TestFailure { name, message }
        })
        .collect();

    if failures.is_empty() {
        if let Some((passed, total)) = stats {
            if passed < total {
                for k in (passed + 1)..=total {
                    failures.push(TestFailure {
                        name: format!("Test {k}"),
                        message: "test failed".to_string(),
                    });
                }
            }
        }
    }

    failures
}

/// The structured, decided view of one container/tool-output run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxOutputAnalysis {
    pub success: bool,
    pub failure_phase: Option<FailurePhase>,
    pub termination_reason: TerminationReason,
    pub compilation: Option<Vec<CompilationError>>,
    pub tests: Option<TestOutcome>,
    pub summary: String,
}

/// An explicit `Compile:` line is authoritative either way. Absent one,
/// any extracted `error ALxxxx` diagnostic counts as a compile failure
/// even when no `compile: failed`/`compilation failed` phrase appears
/// verbatim in the output.
fn infer_compile_success(output: &str, errors: &[CompilationError]) -> bool {
    if let Some(caps) = compile_status_re().captures(output) {
        return caps[1].eq_ignore_ascii_case("success");
    }
    errors.is_empty() && !compile_failed_re().is_match(output)
}

fn infer_structured_result(output: &str) -> Option<bool> {
    structured_result_re()
        .captures(output)
        .map(|caps| caps[1].eq_ignore_ascii_case("pass"))
}

/// Decide success/failure for one completed run. `timed_out` takes
/// precedence over every textual signal.
pub fn analyze_sandbox_output(output: &str, timed_out: bool) -> SandboxOutputAnalysis {
    if timed_out {
        return SandboxOutputAnalysis {
            success: false,
            failure_phase: Some(FailurePhase::Timeout),
            termination_reason: TerminationReason::Timeout,
            compilation: None,
            tests: None,
            summary: "execution timed out".to_string(),
        };
    }

    let errors = extract_compilation_errors(output);
    let compile_success = infer_compile_success(output, &errors);
    let stats = extract_test_stats(output);
    let structured_pass = infer_structured_result(output);
    let all_tests_passed = crate::success_patterns::all_tests_passed_heuristic(output)
        || stats.is_some_and(|(passed, total)| passed == total && total > 0);

    let success = match structured_pass {
        Some(pass) => compile_success && pass,
        None => compile_success && all_tests_passed,
    };

    if success {
        return SandboxOutputAnalysis {
            success: true,
            failure_phase: None,
            termination_reason: TerminationReason::Success,
            compilation: None,
            tests: stats.map(|(passed, total)| TestOutcome { passed, total, failures: Vec::new() }),
            summary: "compile and tests passed".to_string(),
        };
    }

    if !compile_success {
        return SandboxOutputAnalysis {
            success: false,
            failure_phase: Some(FailurePhase::Compilation),
            termination_reason: TerminationReason::Error,
            compilation: Some(errors),
            tests: None,
            summary: "compilation failed".to_string(),
        };
    }

    if let Some((passed, total)) = stats {
        if passed < total {
            let failures = extract_test_failures(output, stats);
            return SandboxOutputAnalysis {
                success: false,
                failure_phase: Some(FailurePhase::TestExecution),
                termination_reason: TerminationReason::TestFailure,
                compilation: None,
                tests: Some(TestOutcome { passed, total, failures }),
                summary: format!("{passed}/{total} tests passed"),
            };
        }
    }

    if max_turns_re().is_match(output) {
        return SandboxOutputAnalysis {
            success: false,
            failure_phase: Some(FailurePhase::AgentExecution),
            termination_reason: TerminationReason::MaxTurns,
            compilation: None,
            tests: None,
            summary: "agent exhausted its turn budget".to_string(),
        };
    }

    if container_keyword_re().is_match(output) && failure_keyword_re().is_match(output) {
        return SandboxOutputAnalysis {
            success: false,
            failure_phase: Some(FailurePhase::ContainerStartup),
            termination_reason: TerminationReason::Error,
            compilation: None,
            tests: None,
            summary: "container failed to start".to_string(),
        };
    }

    SandboxOutputAnalysis {
        success: false,
        failure_phase: Some(FailurePhase::Unknown),
        termination_reason: TerminationReason::Error,
        compilation: None,
        tests: None,
        summary: "could not classify non-success output".to_string(),
    }
}

impl SandboxOutputAnalysis {
    /// Build the `DetailedFailureReason` the executors attach on non-success.
    pub fn into_failure_reason(self) -> DetailedFailureReason {
        DetailedFailureReason {
            termination_reason: self.termination_reason,
            phase: self.failure_phase.unwrap_or(FailurePhase::Unknown),
            summary: self.summary,
            compilation: self.compilation,
            tests: self.tests,
            timeout_ms: None,
            container: None,
            failed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_compilation_failure_extracts_structured_error() {
        let output = "App.al(12,3): error AL0118: unknown identifier";
        let analysis = analyze_sandbox_output(output, false);
        assert_eq!(analysis.failure_phase, Some(FailurePhase::Compilation));
        assert_eq!(analysis.termination_reason, TerminationReason::Error);
        let errors = analysis.compilation.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, "App.al");
        assert_eq!(errors[0].line, 12);
        assert_eq!(errors[0].column, 3);
        assert_eq!(errors[0].code, "AL0118");
        assert_eq!(errors[0].message, "unknown identifier");
    }

    #[test]
    fn s3_timeout_dominates_every_other_signal() {
        let analysis = analyze_sandbox_output("Compile: Success\nResult: Pass", true);
        assert!(!analysis.success);
        assert_eq!(analysis.failure_phase, Some(FailurePhase::Timeout));
        assert_eq!(analysis.termination_reason, TerminationReason::Timeout);
    }

    #[test]
    fn generic_error_lines_are_deduplicated() {
        let output = "ERROR: bad thing\nERROR: bad thing\nERROR: other thing";
        let errors = extract_compilation_errors(output);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn partial_test_pass_synthesizes_placeholders_when_unnamed() {
        let failures = extract_test_failures("2/5 passed", Some((2, 5)));
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].name, "Test 3");
    }

    #[test]
    fn named_test_failures_merge_across_two_passes() {
        let output = "Testfunction TestFoo Failure\nTestfunction TestFoo Error: bad assert\nTestfunction TestBar Exception: boom";
        let failures = extract_test_failures(output, Some((0, 2)));
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].name, "TestFoo");
        assert_eq!(failures[0].message, "bad assert");
        assert_eq!(failures[1].name, "TestBar");
        assert_eq!(failures[1].message, "boom");
    }

    #[test]
    fn structured_result_combines_with_compile_status() {
        let analysis = analyze_sandbox_output("Compile: Success\nResult: Fail", false);
        assert!(!analysis.success);
    }

    #[test]
    fn full_pass_yields_success() {
        let analysis = analyze_sandbox_output("Compile: Success\nTests: 3/3\nResult: Pass", false);
        assert!(analysis.success);
        assert_eq!(analysis.termination_reason, TerminationReason::Success);
    }
}
