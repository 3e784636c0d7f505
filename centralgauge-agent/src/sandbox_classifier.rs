//! Adapts the sandbox crate's pure-function output analyzer to this
//! crate's `FailureClassifier` trait, so sandboxed executions get the
//! same structured diagnosis non-sandboxed executions fall back from.

use centralgauge_core::{DetailedFailureReason, TerminationReason};
use centralgauge_sandbox::analyzer::analyze_sandbox_output;

use crate::executor::FailureClassifier;

pub struct SandboxFailureClassifier;

impl FailureClassifier for SandboxFailureClassifier {
    fn classify(&self, termination_reason: TerminationReason, aggregated_output: &str) -> DetailedFailureReason {
        let timed_out = termination_reason == TerminationReason::Timeout;
        analyze_sandbox_output(aggregated_output, timed_out).into_failure_reason()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use centralgauge_core::FailurePhase;

    #[test]
    fn classifies_compilation_failure_from_aggregated_output() {
        let classifier = SandboxFailureClassifier;
        let reason = classifier.classify(
            TerminationReason::Error,
            "App.al(12,3): error AL0118: unknown identifier",
        );
        assert_eq!(reason.phase, FailurePhase::Compilation);
    }

    #[test]
    fn timeout_termination_is_classified_as_timeout_phase() {
        let classifier = SandboxFailureClassifier;
        let reason = classifier.classify(TerminationReason::Timeout, "Compile: Success");
        assert_eq!(reason.phase, FailurePhase::Timeout);
    }
}
