//! Before-apply diagnostics for a proposed fix, per §4.8's `ValidateFix`.

use std::path::Path;

const SUSPICIOUS_SIZE_CHARS: usize = 1000;

/// One diagnostic surfaced before attempting to apply a fix. Diagnostics
/// are advisory; callers decide whether to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixDiagnostic {
    MissingFile,
    MissingCodeBefore,
    FuzzyMatchOnly,
    SuspiciousSize { chars: usize },
}

/// Runs every applicable diagnostic against `path`/`code_before`,
/// returning each one that fires. An empty result means the fix looks
/// safe to apply, but callers may still choose to prompt on
/// `FuzzyMatchOnly`.
pub fn validate_fix(path: &Path, code_before: &str, code_after: &str) -> Vec<FixDiagnostic> {
    let mut diagnostics = Vec::new();

    let Ok(content) = std::fs::read_to_string(path) else {
        diagnostics.push(FixDiagnostic::MissingFile);
        return diagnostics;
    };

    if code_before.trim().is_empty() {
        diagnostics.push(FixDiagnostic::MissingCodeBefore);
        return diagnostics;
    }

    if !content.contains(code_before) {
        let normalized = |text: &str| {
            text.lines()
                .map(|line| line.trim().split_whitespace().collect::<Vec<_>>().join(" "))
                .collect::<Vec<_>>()
                .join("\n")
        };
        if normalized(&content).contains(&normalized(code_before)) {
            diagnostics.push(FixDiagnostic::FuzzyMatchOnly);
        }
    }

    if code_before.len() > SUSPICIOUS_SIZE_CHARS || code_after.len() > SUSPICIOUS_SIZE_CHARS {
        diagnostics.push(FixDiagnostic::SuspiciousSize {
            chars: code_before.len().max(code_after.len()),
        });
    }

    diagnostics
}
