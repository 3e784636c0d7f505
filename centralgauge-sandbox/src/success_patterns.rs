//! The §4.1 test-success phrasings, restated here so the sandbox output
//! analyzer has no dependency on `centralgauge-agent` (dependency flows
//! the other way: the agent crate's sandbox failure classifier depends on
//! this crate's `analyzer`, not vice versa).

use std::sync::OnceLock;

use regex::Regex;

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

fn n_of_n_matches(output: &str) -> bool {
    n_of_n_passed_re()
        .captures_iter(output)
        .any(|caps| caps.get(1).zip(caps.get(2)).is_some_and(|(a, b)| a.as_str() == b.as_str()))
}

/// All of §4.1's test-mode success phrasings, including the
/// compile-success-plus-absence-of-"failed" fallback.
pub fn all_tests_passed_heuristic(output: &str) -> bool {
    all_tests_passed_re().is_match(output)
        || n_tests_passed_re().is_match(output)
        || n_of_n_matches(output)
        || all_n_tests_passed_re().is_match(output)
        || task_completed_re().is_match(output)
        || ran_successfully_re().is_match(output)
        || (compile_success_re().is_match(output) && !failed_word_re().is_match(output))
}
