//! Typed error enums for the component boundaries that return structured
//! outcomes rather than `AgentExecutionResult`-style success/failure
//! values: configuration loading, verification, and fix application.
//! Fatal, process-level conditions still surface through `anyhow::Error`
//! at the binary boundary.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("agent config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to parse agent config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read agent config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("agent config {id} is missing a required field: {field}")]
    MissingField { id: String, field: &'static str },

    #[error("agent config {id} has maxTurns={max_turns}, which must be > 0")]
    NonPositiveMaxTurns { id: String, max_turns: i64 },

    #[error("agent config {id} has no allowedTools entries")]
    EmptyAllowedTools { id: String },

    #[error("inheritance cycle detected while resolving {id}: {chain:?}")]
    InheritanceCycle { id: String, chain: Vec<String> },

    #[error("agent config {id} extends unknown parent {parent}")]
    UnknownParent { id: String, parent: String },
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("could not derive a task id from test file name: {0}")]
    UnrecognizedTestFileName(PathBuf),

    #[error("prerequisite app.json not found for task {task_id} at {path}")]
    MissingPrerequisite { task_id: String, path: PathBuf },

    #[error("circular prerequisite dependency involving {task_id}")]
    CircularPrerequisite { task_id: String },

    #[error("failed to read app.json at {path}: {source}")]
    AppJsonRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse app.json at {path}: {source}")]
    AppJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("compiler backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("io error staging verify directory at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum FixError {
    #[error("target file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("codeBefore not found in {path} via exact, normalized, or fuzzy match")]
    NoMatch { path: PathBuf },

    #[error("multi-hunk fix has mismatched hunk counts: {before_hunks} in codeBefore vs {after_hunks} in codeAfter")]
    HunkCountMismatch { before_hunks: usize, after_hunks: usize },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create backup of {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox platform unavailable: {0}")]
    PlatformUnavailable(String),

    #[error("tool server did not become healthy after {attempts} attempts")]
    ToolServerUnhealthy { attempts: u32 },

    #[error("container operation failed: {0}")]
    Container(String),

    #[error("io error preparing task directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages_name_the_offending_field() {
        let err = ConfigError::MissingField { id: "claude-sandbox".to_string(), field: "model" };
        assert_eq!(
            err.to_string(),
            "agent config claude-sandbox is missing a required field: model"
        );
    }

    #[test]
    fn fix_error_reports_hunk_count_mismatch() {
        let err = FixError::HunkCountMismatch { before_hunks: 2, after_hunks: 3 };
        assert!(err.to_string().contains("2 in codeBefore"));
        assert!(err.to_string().contains("3 in codeAfter"));
    }
}
