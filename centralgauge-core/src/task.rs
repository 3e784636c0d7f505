//! `TaskManifest`: an immutable, catalogued benchmark task.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::{Difficulty, TaskId};

/// What a task expects of a passing submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpectedOutcome {
    /// Whether the generated project must compile.
    pub compile: bool,
    /// Path to a hidden test file, if this task also requires tests to pass.
    #[serde(rename = "testApp", skip_serializing_if = "Option::is_none")]
    pub test_app: Option<PathBuf>,
}

/// A catalogued benchmark task. Loaded once and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskManifest {
    pub id: TaskId,
    pub description: String,
    pub expected: ExpectedOutcome,
}

impl TaskManifest {
    pub fn difficulty(&self) -> Difficulty {
        self.id.difficulty()
    }

    /// Whether the task additionally requires the verify/test tool to be
    /// invoked during prompt construction.
    pub fn requires_tests(&self) -> bool {
        self.expected.test_app.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(test_app: Option<&str>) -> TaskManifest {
        TaskManifest {
            id: TaskId::parse("CG-AL-E008").unwrap(),
            description: "Create a simple table extension".to_string(),
            expected: ExpectedOutcome {
                compile: true,
                test_app: test_app.map(PathBuf::from),
            },
        }
    }

    #[test]
    fn requires_tests_reflects_expected_test_app() {
        assert!(!sample(None).requires_tests());
        assert!(sample(Some("tests/al/easy/CG-AL-E008.Test.al")).requires_tests());
    }

    #[test]
    fn difficulty_is_derived_from_id() {
        assert_eq!(sample(None).difficulty(), Difficulty::Easy);
    }
}
