//! Stable identifiers for tasks and executions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Difficulty tier encoded in a task id's letter (`E`/`M`/`H`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'E' => Some(Difficulty::Easy),
            'M' => Some(Difficulty::Medium),
            'H' => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stable task identifier of the shape `CG-AL-E008`. The embedded letter
/// after `CG-AL-` yields the difficulty tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

#[derive(Debug, thiserror::Error)]
pub enum TaskIdError {
    #[error("task id '{0}' does not match the CG-AL-[EMH]<digits> pattern")]
    InvalidShape(String),
}

impl TaskId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, TaskIdError> {
        let raw = raw.into();
        if Self::difficulty_letter(&raw).is_some() {
            Ok(Self(raw))
        } else {
            Err(TaskIdError::InvalidShape(raw))
        }
    }

    fn difficulty_letter(raw: &str) -> Option<char> {
        let suffix = raw.strip_prefix("CG-AL-")?;
        let letter = suffix.chars().next()?;
        let rest = &suffix[letter.len_utf8()..];
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            Difficulty::from_letter(letter).map(|_| letter)
        } else {
            None
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        Self::difficulty_letter(&self.0)
            .and_then(Difficulty::from_letter)
            .unwrap_or(Difficulty::Easy)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaskId {
    type Error = TaskIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TaskId> for String {
    fn from(value: TaskId) -> Self {
        value.0
    }
}

impl FromStr for TaskId {
    type Err = TaskIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Unique per-execution id, minted fresh for every `AgentExecutor::execute`
/// call so each run gets its own working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_difficulty_from_embedded_letter() {
        assert_eq!(TaskId::parse("CG-AL-E008").unwrap().difficulty(), Difficulty::Easy);
        assert_eq!(TaskId::parse("CG-AL-M012").unwrap().difficulty(), Difficulty::Medium);
        assert_eq!(TaskId::parse("CG-AL-H001").unwrap().difficulty(), Difficulty::Hard);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(TaskId::parse("CG-AL-X001").is_err());
        assert!(TaskId::parse("CG-AL-E").is_err());
        assert!(TaskId::parse("not-a-task").is_err());
    }

    #[test]
    fn execution_ids_are_unique() {
        assert_ne!(ExecutionId::new(), ExecutionId::new());
    }
}
