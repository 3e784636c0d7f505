//! Builds the per-failing-task analysis prompt and parses/normalizes the
//! analysis LLM's JSON response, per §4.7. The LLM call itself is a
//! collaborator (`AnalysisLlm`); this module only builds text and parses
//! responses.

use async_trait::async_trait;
use centralgauge_core::{
    AffectedFileType, AnalysisResult, Confidence, FailingTask, FailureType, FixCategory,
    ProposedFix,
};
use serde::Deserialize;

const MAX_COMPILATION_ERRORS: usize = 10;
const MAX_OUTPUT_CHARS: usize = 1800;

/// Collaborator for the configured analysis model. Implementations are
/// excluded from this spec's core per its LLM-adapter Non-goal.
#[async_trait]
pub trait AnalysisLlm: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, String>;
}

const SYSTEM_INSTRUCTION: &str = "You are an AL language and Business Central expert analyzing a \
failed benchmark task. Classify the failure as either `fixable` (a defect in the benchmark task \
itself that can be corrected with an exact code change) or `model_shortcoming` (the generating \
model lacks an AL capability). Respond with raw JSON only, no markdown fences, matching one of:\n\
{\"outcome\":\"fixable\",\"category\":\"id_conflict|syntax_error|test_logic_bug|task_definition_issue\",\
\"description\":\"...\",\"affectedFile\":\"task_yaml|test_al\",\"fix\":{\"description\":\"...\",\
\"codeBefore\":\"...\",\"codeAfter\":\"...\"},\"confidence\":\"low|medium|high\"}\n\
{\"outcome\":\"model_shortcoming\",\"concept\":\"...\",\"alConcept\":\"...\",\"description\":\"...\",\
\"errorCode\":\"...\",\"generatedCode\":\"...\",\"correctPattern\":\"...\",\"confidence\":\"low|medium|high\"}";

/// Builds the analysis prompt for one failing task: task YAML, test AL,
/// the generated non-test code, and a truncated error section.
pub fn build_analysis_prompt(
    task: &FailingTask,
    task_yaml: &str,
    test_al: &str,
    generated_non_test_code: &[(String, String)],
) -> String {
    let mut prompt = String::new();
    prompt.push_str("## Task definition (YAML)\n```yaml\n");
    prompt.push_str(task_yaml);
    prompt.push_str("\n```\n\n## Hidden test (AL)\n```al\n");
    prompt.push_str(test_al);
    prompt.push_str("\n```\n\n## Generated source\n");
    for (path, content) in generated_non_test_code {
        prompt.push_str(&format!("### {path}\n```al\n{content}\n```\n"));
    }
    prompt.push_str("\n## Failure\n");
    prompt.push_str(&format_failure_section(task));
    prompt
}

fn format_failure_section(task: &FailingTask) -> String {
    match task.failure_type {
        FailureType::Compilation => {
            let errors = task.compilation_errors.as_deref().unwrap_or_default();
            let truncated: Vec<_> = errors.iter().take(MAX_COMPILATION_ERRORS).collect();
            let mut section = String::from("Compilation errors:\n");
            for error in &truncated {
                section.push_str(&format!(
                    "- {}({},{}): error {}: {}\n",
                    error.file, error.line, error.column, error.code, error.message
                ));
            }
            if errors.len() > truncated.len() {
                section.push_str(&format!("... and {} more\n", errors.len() - truncated.len()));
            }
            section
        }
        FailureType::Test => {
            let mut section = String::from("Failing tests:\n");
            if let Some(tests) = &task.test_results {
                for failure in &tests.failures {
                    section.push_str(&format!("- {}: {}\n", failure.name, failure.message));
                }
            }
            section.push_str("\nOutput (truncated):\n");
            section.push_str(&truncate_output(&task.output));
            section
        }
    }
}

fn truncate_output(output: &str) -> String {
    if output.len() <= MAX_OUTPUT_CHARS {
        output.to_string()
    } else {
        format!("{}...", &output[..MAX_OUTPUT_CHARS])
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum RawAnalysisResponse {
    Fixable {
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default, rename = "affectedFile")]
        affected_file: Option<String>,
        #[serde(default)]
        fix: Option<RawFix>,
        #[serde(default)]
        confidence: Option<String>,
    },
    ModelShortcoming {
        #[serde(default)]
        concept: Option<String>,
        #[serde(default, rename = "alConcept")]
        al_concept: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default, rename = "errorCode")]
        error_code: Option<String>,
        #[serde(default, rename = "generatedCode")]
        generated_code: Option<String>,
        #[serde(default, rename = "correctPattern")]
        correct_pattern: Option<String>,
        #[serde(default)]
        confidence: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawFix {
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "codeBefore")]
    code_before: Option<String>,
    #[serde(default, rename = "codeAfter")]
    code_after: Option<String>,
}

fn parse_confidence(raw: Option<&str>) -> Confidence {
    match raw {
        Some("low") => Confidence::Low,
        Some("high") => Confidence::High,
        _ => Confidence::Medium,
    }
}

fn parse_category(raw: Option<&str>) -> FixCategory {
    match raw {
        Some("id_conflict") => FixCategory::IdConflict,
        Some("test_logic_bug") => FixCategory::TestLogicBug,
        Some("task_definition_issue") => FixCategory::TaskDefinitionIssue,
        _ => FixCategory::SyntaxError,
    }
}

fn strip_markdown_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else { return trimmed };
    let after_open = after_open.trim_start_matches("json").trim_start();
    after_open.strip_suffix("```").unwrap_or(after_open).trim()
}

/// Parses the analysis LLM's raw response for `task`, normalizing
/// `affectedFile` and always overriding `fix.filePath` with the path
/// derived from `task` (never trusting the LLM to invent a path). Any
/// parse failure yields a low-confidence `parse-failure` shortcoming.
pub fn parse_analysis_response(raw_response: &str, task: &FailingTask) -> AnalysisResult {
    let body = strip_markdown_fences(raw_response);
    let parsed: Result<RawAnalysisResponse, _> = serde_json::from_str(body);
    match parsed {
        Ok(RawAnalysisResponse::Fixable { category, description, affected_file, fix, confidence }) => {
            let Some(fix) = fix else { return AnalysisResult::parse_failure(raw_response) };
            let (Some(code_before), Some(code_after)) = (fix.code_before, fix.code_after) else {
                return AnalysisResult::parse_failure(raw_response);
            };
            let file_type = match affected_file.as_deref() {
                Some("test_al") => AffectedFileType::TestAl,
                _ => AffectedFileType::TaskYaml,
            };
            let file_path = match file_type {
                AffectedFileType::TaskYaml => task.task_yaml_path.clone(),
                AffectedFileType::TestAl => task.test_al_path.clone(),
            };
            AnalysisResult::Fixable {
                category: parse_category(category.as_deref()),
                description: description.unwrap_or_default(),
                fix: ProposedFix {
                    file_type,
                    file_path,
                    description: fix.description.unwrap_or_default(),
                    code_before,
                    code_after,
                },
                confidence: parse_confidence(confidence.as_deref()),
            }
        }
        Ok(RawAnalysisResponse::ModelShortcoming {
            concept,
            al_concept,
            description,
            error_code,
            generated_code,
            correct_pattern,
            confidence,
        }) => AnalysisResult::ModelShortcoming {
            concept: concept.unwrap_or_else(|| "unknown".to_string()),
            al_concept: al_concept.unwrap_or_else(|| "unknown".to_string()),
            description: description.unwrap_or_default(),
            error_code,
            generated_code: generated_code.unwrap_or_default(),
            correct_pattern: correct_pattern.unwrap_or_default(),
            confidence: parse_confidence(confidence.as_deref()),
        },
        Err(_) => AnalysisResult::parse_failure(raw_response),
    }
}

/// The fixed system instruction every analysis call uses, per §4.4 step 2
/// (temperature 0.1, max tokens ~4000 are set by the caller alongside
/// this instruction).
pub fn system_instruction() -> &'static str {
    SYSTEM_INSTRUCTION
}

#[cfg(test)]
mod tests {
    use super::*;
    use centralgauge_core::{Difficulty, TaskId};
    use std::path::PathBuf;

    fn failing_task() -> FailingTask {
        FailingTask {
            task_id: TaskId::parse("CG-AL-E008").unwrap(),
            difficulty: Difficulty::Easy,
            failure_type: FailureType::Compilation,
            model: "claude".to_string(),
            attempt: 1,
            compilation_errors: Some(vec![]),
            test_results: None,
            output: "x".repeat(3000),
            task_yaml_path: PathBuf::from("tasks/easy/CG-AL-E008.yml"),
            test_al_path: PathBuf::from("tests/al/easy/CG-AL-E008.Test.al"),
            generated_code_path: "artifacts/CG-AL-E008/anthropic_claude/attempt_1/project".to_string(),
            session_id: "1".to_string(),
        }
    }

    #[test]
    fn parses_fixable_response_and_overrides_file_path() {
        let raw = r#"{"outcome":"fixable","category":"syntax_error","description":"missing semicolon",
            "affectedFile":"test_al","fix":{"description":"add semicolon","codeBefore":"a","codeAfter":"a;"},
            "confidence":"high"}"#;
        let task = failing_task();
        let result = parse_analysis_response(raw, &task);
        match result {
            AnalysisResult::Fixable { fix, confidence, .. } => {
                assert_eq!(fix.file_path, task.test_al_path);
                assert_eq!(confidence, Confidence::High);
            }
            other => panic!("expected Fixable, got {other:?}"),
        }
    }

    #[test]
    fn strips_markdown_fences_before_parsing() {
        let raw = "```json\n{\"outcome\":\"model_shortcoming\",\"concept\":\"flowfields\",\"alConcept\":\"FlowField\",\"description\":\"d\",\"generatedCode\":\"g\",\"correctPattern\":\"c\",\"confidence\":\"medium\"}\n```";
        let task = failing_task();
        let result = parse_analysis_response(raw, &task);
        assert!(matches!(result, AnalysisResult::ModelShortcoming { .. }));
    }

    #[test]
    fn unparseable_response_becomes_low_confidence_parse_failure() {
        let task = failing_task();
        let result = parse_analysis_response("not json", &task);
        match result {
            AnalysisResult::ModelShortcoming { concept, confidence, .. } => {
                assert_eq!(concept, "parse-failure");
                assert_eq!(confidence, Confidence::Low);
            }
            other => panic!("expected ModelShortcoming, got {other:?}"),
        }
    }

    #[test]
    fn compilation_error_section_truncates_to_ten_entries() {
        let mut task = failing_task();
        task.compilation_errors = Some(
            (0..15)
                .map(|i| centralgauge_core::CompilationError {
                    file: "Codeunit1.al".to_string(),
                    line: i,
                    column: 1,
                    code: "AL0001".to_string(),
                    message: format!("error {i}"),
                })
                .collect(),
        );
        let section = format_failure_section(&task);
        assert_eq!(section.lines().filter(|line| line.starts_with("- ")).count(), 10);
        assert!(section.contains("5 more"));
    }
}
