//! Parses a benchmark run's debug directory into the set of tasks that
//! ultimately failed for each model, per §4.4's failure-collection rules.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use centralgauge_commons::to_forward_slash;
use centralgauge_core::{
    CompilationError, Difficulty, FailingTask, FailureType, TaskId, TestFailure, TestOutcome,
};
use regex::Regex;
use serde::Deserialize;

fn session_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(compilation|tests)-.*-session-(\d+)\.jsonl$").expect("valid regex")
    })
}

#[derive(Debug, Deserialize)]
struct RawCompilationError {
    file: String,
    line: u32,
    column: u32,
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawTestFailure {
    name: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawTestResults {
    passed: u32,
    total: u32,
    #[serde(default)]
    failures: Vec<RawTestFailure>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "taskId")]
    task_id: String,
    model: String,
    attempt: u32,
    success: bool,
    #[serde(default)]
    errors: Vec<RawCompilationError>,
    #[serde(default)]
    results: Option<RawTestResults>,
    #[serde(default)]
    output: String,
}

struct ParsedRecord {
    task_id: String,
    model: String,
    attempt: u32,
    success: bool,
    compilation_errors: Vec<CompilationError>,
    test_results: Option<TestOutcome>,
    output: String,
}

/// A `(taskId, model)` pair, keyed for the per-session eventual-success
/// and supersession bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey {
    task_id: String,
    model: String,
}

/// Discover available session ids in `debug_dir` by filename, highest
/// first.
pub fn discover_sessions(debug_dir: &Path) -> std::io::Result<Vec<u64>> {
    let mut sessions = Vec::new();
    for entry in std::fs::read_dir(debug_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(caps) = session_file_re().captures(&name) {
            if let Ok(id) = caps[2].parse::<u64>() {
                if !sessions.contains(&id) {
                    sessions.push(id);
                }
            }
        }
    }
    sessions.sort_unstable();
    sessions.reverse();
    Ok(sessions)
}

fn session_files(debug_dir: &Path, session_id: u64) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(debug_dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(caps) = session_file_re().captures(&name) {
            if caps[2].parse::<u64>().ok() == Some(session_id) {
                files.push((caps[1].to_string(), path));
            }
        }
    }
    Ok(files)
}

fn parse_records(debug_dir: &Path, session_id: u64) -> std::io::Result<Vec<ParsedRecord>> {
    let mut records = Vec::new();
    for (_kind, path) in session_files(debug_dir, session_id)? {
        let content = std::fs::read_to_string(&path)?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let raw: RawRecord = match serde_json::from_str(line) {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            let (compilation_errors, test_results) = match raw.kind.as_str() {
                "compilation_result" => (
                    raw.errors
                        .into_iter()
                        .map(|e| CompilationError {
                            file: e.file,
                            line: e.line,
                            column: e.column,
                            code: e.code,
                            message: e.message,
                        })
                        .collect(),
                    None,
                ),
                "test_result" => (
                    Vec::new(),
                    raw.results.map(|r| TestOutcome {
                        passed: r.passed,
                        total: r.total,
                        failures: r
                            .failures
                            .into_iter()
                            .map(|f| TestFailure { name: f.name, message: f.message })
                            .collect(),
                    }),
                ),
                _ => continue,
            };
            records.push(ParsedRecord {
                task_id: raw.task_id,
                model: raw.model,
                attempt: raw.attempt,
                success: raw.success,
                compilation_errors,
                test_results,
                output: raw.output,
            });
        }
    }
    Ok(records)
}

fn latest_by_attempt(records: &[ParsedRecord]) -> HashMap<PairKey, &ParsedRecord> {
    let mut latest: HashMap<PairKey, &ParsedRecord> = HashMap::new();
    for record in records {
        let key = PairKey { task_id: record.task_id.clone(), model: record.model.clone() };
        match latest.get(&key) {
            Some(existing) if existing.attempt >= record.attempt => {}
            _ => {
                latest.insert(key, record);
            }
        }
    }
    latest
}

fn task_yaml_path(repo_root: &Path, task_id: &str, difficulty: Difficulty) -> Option<PathBuf> {
    let dir = repo_root.join("tasks").join(difficulty.as_str());
    let entries = std::fs::read_dir(&dir).ok()?;
    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with(task_id))
                .unwrap_or(false)
        })
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("yml"))
}

fn test_al_path(repo_root: &Path, task_id: &str, difficulty: Difficulty) -> PathBuf {
    repo_root
        .join("tests")
        .join("al")
        .join(difficulty.as_str())
        .join(format!("{task_id}.Test.al"))
}

fn generated_code_path(debug_dir: &Path, task_id: &str, model: &str, attempt: u32) -> String {
    let path = debug_dir
        .join("artifacts")
        .join(task_id)
        .join(format!("anthropic_{model}"))
        .join(format!("attempt_{attempt}"))
        .join("project");
    to_forward_slash(&path)
}

/// Collects the tasks that ultimately failed in `session_id` (or the
/// latest session if `None`), applying the eventual-success exclusion
/// and compilation-supersedes-test-failure rules from §4.4.
pub fn collect_failing_tasks(
    debug_dir: &Path,
    repo_root: &Path,
    session_id: Option<u64>,
) -> std::io::Result<Vec<FailingTask>> {
    let session_id = match session_id {
        Some(id) => id,
        None => match discover_sessions(debug_dir)?.into_iter().next() {
            Some(id) => id,
            None => return Ok(Vec::new()),
        },
    };

    let records = parse_records(debug_dir, session_id)?;
    let compilation_records: Vec<ParsedRecord> = records
        .iter()
        .filter(|r| r.test_results.is_none())
        .map(clone_record)
        .collect();
    let test_records: Vec<ParsedRecord> = records
        .iter()
        .filter(|r| r.test_results.is_some())
        .map(clone_record)
        .collect();

    let latest_compilation = latest_by_attempt(&compilation_records);
    let latest_test = latest_by_attempt(&test_records);

    let mut failing = Vec::new();
    let mut compilation_emitted: std::collections::HashSet<PairKey> = std::collections::HashSet::new();

    for (key, record) in &latest_compilation {
        let eventually_successful = record.success
            && latest_test.get(key).map(|t| t.success).unwrap_or(false);
        if eventually_successful {
            continue;
        }
        if record.success {
            continue;
        }
        let Ok(task_id) = TaskId::parse(key.task_id.clone()) else { continue };
        let difficulty = task_id.difficulty();
        let Some(yaml_path) = task_yaml_path(repo_root, &key.task_id, difficulty) else { continue };
        compilation_emitted.insert(key.clone());
        failing.push(FailingTask {
            task_id: task_id.clone(),
            difficulty,
            failure_type: FailureType::Compilation,
            model: key.model.clone(),
            attempt: record.attempt,
            compilation_errors: Some(record.compilation_errors.clone()),
            test_results: None,
            output: record.output.clone(),
            task_yaml_path: yaml_path,
            test_al_path: test_al_path(repo_root, &key.task_id, difficulty),
            generated_code_path: generated_code_path(
                debug_dir,
                &key.task_id,
                &key.model,
                record.attempt,
            ),
            session_id: session_id.to_string(),
        });
    }

    for (key, record) in &latest_test {
        if record.success || compilation_emitted.contains(key) {
            continue;
        }
        let compile_latest_ok = latest_compilation.get(key).map(|c| c.success).unwrap_or(true);
        if !compile_latest_ok {
            continue;
        }
        let Ok(task_id) = TaskId::parse(key.task_id.clone()) else { continue };
        let difficulty = task_id.difficulty();
        let Some(yaml_path) = task_yaml_path(repo_root, &key.task_id, difficulty) else { continue };
        failing.push(FailingTask {
            task_id: task_id.clone(),
            difficulty,
            failure_type: FailureType::Test,
            model: key.model.clone(),
            attempt: record.attempt,
            compilation_errors: None,
            test_results: record.test_results.clone(),
            output: record.output.clone(),
            task_yaml_path: yaml_path,
            test_al_path: test_al_path(repo_root, &key.task_id, difficulty),
            generated_code_path: generated_code_path(
                debug_dir,
                &key.task_id,
                &key.model,
                record.attempt,
            ),
            session_id: session_id.to_string(),
        });
    }

    Ok(failing)
}

fn clone_record(record: &ParsedRecord) -> ParsedRecord {
    ParsedRecord {
        task_id: record.task_id.clone(),
        model: record.model.clone(),
        attempt: record.attempt,
        success: record.success,
        compilation_errors: record.compilation_errors.clone(),
        test_results: record.test_results.clone(),
        output: record.output.clone(),
    }
}
