//! Strict-layered success detection over aggregated tool output text.
//! The SDK's own notion of a successful run is never trusted; success is
//! decided purely from this text.

use std::sync::OnceLock;

use regex::Regex;

fn structured_result_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)result:\s*(pass|fail)").expect("valid regex"))
}

fn all_tests_passed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)all tests passed").expect("valid regex"))
}

fn n_tests_passed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\d+\s+tests passed").expect("valid regex"))
}

fn n_of_n_passed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)/(\d+)\s+passed").expect("valid regex"))
}

/// The structured `Tests: <passed>/<total>` line emitted alongside
/// `Compile:`/`Result:` lines (see S2); distinct from the `N/N passed`
/// prose pattern above since it carries no trailing "passed" word.
fn tests_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)tests:\s*(\d+)/(\d+)").expect("valid regex"))
}

fn all_n_tests_passed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)all\s+\d+\s+(?:verification\s+)?tests passed").expect("valid regex")
    })
}

fn task_completed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)task completed successfully|task is now complete").expect("valid regex")
    })
}

fn ran_successfully_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)ran successfully \(0 failures\)").expect("valid regex"))
}

fn failed_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bfailed\b").expect("valid regex"))
}

fn compile_success_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?ix)
            compilation\ successful
            | compilation:\s*(\*\*)?success(\*\*)?
            | ✅\s*compilation
            | ✅\s*success
            | "success"\s*:\s*true
            | success:\s*true
            | returning\ success:\s*true
            "#,
        )
        .expect("valid regex")
    })
}

/// `Result:\s*(Pass|Fail)` dominates every other signal when present.
pub fn detect_structured_result(output: &str) -> Option<bool> {
    structured_result_re()
        .captures(output)
        .map(|caps| caps.get(1).is_some_and(|m| m.as_str().eq_ignore_ascii_case("pass")))
}

pub fn detect_compile_success_pattern(output: &str) -> bool {
    compile_success_re().is_match(output)
}

fn compile_status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)compile:\s*(success|failed)").expect("valid regex"))
}

/// Extract an explicit `Compile: Success|Failed` line, if present.
pub fn extract_compile_status(output: &str) -> Option<bool> {
    compile_status_re()
        .captures(output)
        .map(|caps| caps.get(1).is_some_and(|m| m.as_str().eq_ignore_ascii_case("success")))
}

/// Extract the first `Tests: <passed>/<total>` or `<passed>/<total>
/// passed` pair, regardless of whether the counts match.
pub fn extract_test_stats(output: &str) -> Option<(u32, u32)> {
    let caps = tests_line_re().captures(output).or_else(|| n_of_n_passed_re().captures(output))?;
    let passed = caps.get(1)?.as_str().parse().ok()?;
    let total = caps.get(2)?.as_str().parse().ok()?;
    Some((passed, total))
}

fn n_of_n_matches(output: &str) -> bool {
    n_of_n_passed_re()
        .captures_iter(output)
        .any(|caps| caps.get(1).zip(caps.get(2)).is_some_and(|(a, b)| a.as_str() == b.as_str()))
}

/// All of the `§4.1` test-mode success phrasings, including the
/// compile-success-plus-absence-of-"failed" fallback. Exposed for reuse
/// by the sandbox output analyzer, which applies the same heuristics when
/// no structured `Result:` line is present.
pub fn all_tests_passed_heuristic(output: &str) -> bool {
    all_tests_passed_re().is_match(output)
        || n_tests_passed_re().is_match(output)
        || n_of_n_matches(output)
        || all_n_tests_passed_re().is_match(output)
        || task_completed_re().is_match(output)
        || ran_successfully_re().is_match(output)
        || (detect_compile_success_pattern(output) && !failed_word_re().is_match(output))
}

/// How a success verdict was reached, surfaced for diagnostics and for
/// asserting the "structured result dominates" property in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    StructuredResult,
    TestPatterns,
    CompilePattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessDetection {
    pub success: bool,
    pub method: DetectionMethod,
}

/// Strict layering, first match wins:
/// 1. a structured `Result: Pass|Fail` line, if present, is authoritative;
/// 2. otherwise, if the task requires tests, any test-success pattern;
/// 3. otherwise, any compile-success pattern.
pub fn detect_success(output: &str, requires_tests: bool) -> SuccessDetection {
    if let Some(success) = detect_structured_result(output) {
        return SuccessDetection { success, method: DetectionMethod::StructuredResult };
    }
    if requires_tests {
        SuccessDetection {
            success: all_tests_passed_heuristic(output),
            method: DetectionMethod::TestPatterns,
        }
    } else {
        SuccessDetection {
            success: detect_compile_success_pattern(output),
            method: DetectionMethod::CompilePattern,
        }
    }
}
