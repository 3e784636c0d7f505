//! `VerifyOrchestrator`: given a debug directory's failing tasks, asks
//! the analysis LLM to classify each one and acts on the verdict, per
//! §4.4. Drives a bounded-concurrency worker pool sized to `maxParallel`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use centralgauge_core::{AnalysisResult, Confidence, FailingTask, FixCategory};
use centralgauge_fix::apply_fix;
use futures::stream::{self, StreamExt};

use crate::prompt::{build_analysis_prompt, parse_analysis_response, system_instruction, AnalysisLlm};
use crate::shortcomings::ShortcomingsTracker;

/// Which side-effects the orchestrator is allowed to perform this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorMode {
    All,
    FixesOnly,
    ShortcomingsOnly,
}

impl OrchestratorMode {
    fn may_apply_fixes(self) -> bool {
        !matches!(self, OrchestratorMode::ShortcomingsOnly)
    }

    fn may_record_shortcomings(self) -> bool {
        !matches!(self, OrchestratorMode::FixesOnly)
    }
}

/// The interactive prompt shown for a `Fixable` verdict. A collaborator:
/// CLI interaction itself is excluded from this crate's core.
#[async_trait]
pub trait InteractionPrompt: Send + Sync {
    async fn ask(&self, task: &FailingTask, description: &str) -> PromptDecision;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptDecision {
    Apply,
    Skip,
    Quit,
}

/// Typed progress events the orchestrator publishes, per §4.4.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    Started { total: usize },
    Analyzing { task_id: String, model: String },
    AnalysisComplete { task_id: String, model: String, fixable: bool },
    FixProposed { task_id: String, category: FixCategory },
    FixApplied { task_id: String },
    FixSkipped { task_id: String },
    ShortcomingLogged { task_id: String, al_concept: String },
    Error { task_id: String, message: String },
    Complete { analyzed: usize, fixed: usize, skipped: usize, shortcomings: usize },
}

/// Callback sink for `OrchestratorEvent`s, mirroring the teacher's
/// `EventSink` callback shape. A listener panic/unwind is not caught —
/// callers should keep listeners infallible; logging errors internally
/// is the expected pattern for a listener that can fail.
pub type EventSink = Arc<Mutex<Box<dyn FnMut(&OrchestratorEvent) + Send>>>;

fn emit(sink: &Option<EventSink>, event: OrchestratorEvent) {
    if let Some(sink) = sink {
        if let Ok(mut callback) = sink.lock() {
            callback(&event);
        }
    }
}

/// A failing task's loaded analysis context.
struct LoadedContext {
    task_yaml: String,
    test_al: String,
    non_test_sources: Vec<(String, String)>,
}

fn load_context(task: &FailingTask) -> std::io::Result<LoadedContext> {
    let task_yaml = std::fs::read_to_string(&task.task_yaml_path)?;
    let test_al = std::fs::read_to_string(&task.test_al_path)?;

    let mut non_test_sources = Vec::new();
    if let Ok(entries) = std::fs::read_dir(&task.generated_code_path) {
        for entry in entries.flatten() {
            let path = entry.path();
            let is_test_file = path
                .file_name()
                .map(|n| {
                    let name = n.to_string_lossy().to_lowercase();
                    name.contains("test")
                })
                .unwrap_or(false);
            if path.extension().and_then(|e| e.to_str()) == Some("al") && !is_test_file {
                if let Ok(content) = std::fs::read_to_string(&path) {
                    non_test_sources.push((path.to_string_lossy().into_owned(), content));
                }
            }
        }
    }

    Ok(LoadedContext { task_yaml, test_al, non_test_sources })
}

pub struct OrchestratorSummary {
    pub analyzed: usize,
    pub fixed: usize,
    pub skipped: usize,
    pub shortcomings: usize,
}

pub struct VerifyOrchestrator<L: AnalysisLlm, P: InteractionPrompt> {
    llm: L,
    prompt: P,
    tracker: ShortcomingsTracker,
    mode: OrchestratorMode,
    max_parallel: usize,
    event_sink: Option<EventSink>,
    quit: Arc<AtomicBool>,
}

impl<L: AnalysisLlm + Send + Sync + 'static, P: InteractionPrompt + Send + Sync + 'static>
    VerifyOrchestrator<L, P>
{
    pub fn new(
        llm: L,
        prompt: P,
        shortcomings_dir: impl Into<std::path::PathBuf>,
        mode: OrchestratorMode,
        max_parallel: usize,
        event_sink: Option<EventSink>,
    ) -> Self {
        Self {
            llm,
            prompt,
            tracker: ShortcomingsTracker::new(shortcomings_dir),
            mode,
            max_parallel: max_parallel.max(1),
            event_sink,
            quit: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs the full pipeline over `failing_tasks`, keeping up to
    /// `maxParallel` analyses in flight at once (a new one starts as soon
    /// as a slot frees, per §4.4's worker-pool description) rather than
    /// processing strictly one at a time. A `quit` decision from the
    /// interactive prompt stops new dispatch but lets in-flight tasks
    /// finish, by gating the underlying stream rather than cancelling
    /// anything already running.
    pub async fn run(&self, failing_tasks: Vec<FailingTask>) -> OrchestratorSummary {
        emit(&self.event_sink, OrchestratorEvent::Started { total: failing_tasks.len() });

        let mut analyzed = 0usize;
        let mut fixed = 0usize;
        let mut skipped = 0usize;
        let mut shortcomings = 0usize;

        let results: Vec<TaskOutcome> = stream::iter(failing_tasks)
            .take_while(|_task| {
                let should_continue = !self.quit.load(Ordering::SeqCst);
                async move { should_continue }
            })
            .map(|task| async move { self.process_one(&task).await })
            .buffer_unordered(self.max_parallel)
            .collect()
            .await;

        for outcome in results {
            match outcome {
                TaskOutcome::Analyzed { fixed: was_fixed, skipped: was_skipped, shortcoming } => {
                    analyzed += 1;
                    if was_fixed {
                        fixed += 1;
                    }
                    if was_skipped {
                        skipped += 1;
                    }
                    if shortcoming {
                        shortcomings += 1;
                    }
                }
                TaskOutcome::LoadError => {}
            }
        }

        emit(&self.event_sink, OrchestratorEvent::Complete { analyzed, fixed, skipped, shortcomings });
        OrchestratorSummary { analyzed, fixed, skipped, shortcomings }
    }

    async fn process_one(&self, task: &FailingTask) -> TaskOutcome {
        let task_id = task.task_id.to_string();
        emit(
            &self.event_sink,
            OrchestratorEvent::Analyzing { task_id: task_id.clone(), model: task.model.clone() },
        );

        let context = match load_context(task) {
            Ok(context) => context,
            Err(err) => {
                emit(
                    &self.event_sink,
                    OrchestratorEvent::Error { task_id: task_id.clone(), message: err.to_string() },
                );
                return TaskOutcome::LoadError;
            }
        };

        let prompt_text = build_analysis_prompt(
            task,
            &context.task_yaml,
            &context.test_al,
            &context.non_test_sources,
        );
        let response = match self.llm.complete(system_instruction(), &prompt_text).await {
            Ok(response) => response,
            Err(message) => {
                emit(&self.event_sink, OrchestratorEvent::Error { task_id: task_id.clone(), message });
                return TaskOutcome::LoadError;
            }
        };

        let result = parse_analysis_response(&response, task);
        let fixable = matches!(result, AnalysisResult::Fixable { .. });
        emit(
            &self.event_sink,
            OrchestratorEvent::AnalysisComplete { task_id: task_id.clone(), model: task.model.clone(), fixable },
        );

        match result {
            AnalysisResult::Fixable { category, description, fix, confidence } if self.mode.may_apply_fixes() => {
                emit(&self.event_sink, OrchestratorEvent::FixProposed { task_id: task_id.clone(), category });
                self.handle_fixable(task, &description, &fix, confidence).await
            }
            AnalysisResult::Fixable { .. } => {
                emit(&self.event_sink, OrchestratorEvent::FixSkipped { task_id: task_id.clone() });
                TaskOutcome::Analyzed { fixed: false, skipped: true, shortcoming: false }
            }
            AnalysisResult::ModelShortcoming { concept, al_concept, description, error_code, generated_code, correct_pattern, .. }
                if self.mode.may_record_shortcomings() =>
            {
                self.tracker.add(
                    &task.model,
                    &al_concept,
                    &concept,
                    &description,
                    &generated_code,
                    &correct_pattern,
                    error_code.as_deref(),
                    &task_id,
                );
                let _ = self.tracker.save_model(&task.model);
                emit(
                    &self.event_sink,
                    OrchestratorEvent::ShortcomingLogged { task_id: task_id.clone(), al_concept },
                );
                TaskOutcome::Analyzed { fixed: false, skipped: false, shortcoming: true }
            }
            AnalysisResult::ModelShortcoming { .. } => {
                TaskOutcome::Analyzed { fixed: false, skipped: false, shortcoming: false }
            }
        }
    }

    async fn handle_fixable(
        &self,
        task: &FailingTask,
        description: &str,
        fix: &centralgauge_core::ProposedFix,
        _confidence: Confidence,
    ) -> TaskOutcome {
        let task_id = task.task_id.to_string();
        match self.prompt.ask(task, description).await {
            PromptDecision::Quit => {
                self.quit.store(true, Ordering::SeqCst);
                emit(&self.event_sink, OrchestratorEvent::FixSkipped { task_id });
                TaskOutcome::Analyzed { fixed: false, skipped: true, shortcoming: false }
            }
            PromptDecision::Skip => {
                emit(&self.event_sink, OrchestratorEvent::FixSkipped { task_id });
                TaskOutcome::Analyzed { fixed: false, skipped: true, shortcoming: false }
            }
            PromptDecision::Apply => {
                match apply_fix(Path::new(&fix.file_path), &fix.code_before, &fix.code_after) {
                    Ok(_) => {
                        emit(&self.event_sink, OrchestratorEvent::FixApplied { task_id });
                        TaskOutcome::Analyzed { fixed: true, skipped: false, shortcoming: false }
                    }
                    Err(err) => {
                        emit(
                            &self.event_sink,
                            OrchestratorEvent::Error { task_id, message: err.to_string() },
                        );
                        TaskOutcome::Analyzed { fixed: false, skipped: true, shortcoming: false }
                    }
                }
            }
        }
    }
}

enum TaskOutcome {
    Analyzed { fixed: bool, skipped: bool, shortcoming: bool },
    LoadError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use centralgauge_core::{Difficulty, FailureType, ProposedFix, TaskId};
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;

    struct FixedResponseLlm {
        response: String,
    }

    #[async_trait]
    impl AnalysisLlm for FixedResponseLlm {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, String> {
            Ok(self.response.clone())
        }
    }

    struct ScriptedPrompt {
        decision: PromptDecision,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl InteractionPrompt for ScriptedPrompt {
        async fn ask(&self, _task: &FailingTask, _description: &str) -> PromptDecision {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.decision
        }
    }

    fn failing_task(dir: &Path) -> FailingTask {
        let task_yaml = dir.join("task.yml");
        let test_al = dir.join("test.al");
        let project_dir = dir.join("project");
        std::fs::write(&task_yaml, "description: sample").unwrap();
        std::fs::write(&test_al, "codeunit 1 Test {}").unwrap();
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("Codeunit1.al"), "codeunit 2 Thing {}").unwrap();

        FailingTask {
            task_id: TaskId::parse("CG-AL-E008").unwrap(),
            difficulty: Difficulty::Easy,
            failure_type: FailureType::Compilation,
            model: "claude".to_string(),
            attempt: 1,
            compilation_errors: Some(vec![]),
            test_results: None,
            output: String::new(),
            task_yaml_path: task_yaml,
            test_al_path: test_al,
            generated_code_path: project_dir.to_string_lossy().into_owned(),
            session_id: "1".to_string(),
        }
    }

    #[tokio::test]
    async fn records_shortcoming_on_model_shortcoming_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let task = failing_task(dir.path());
        let shortcomings_dir = dir.path().join("shortcomings");

        let llm = FixedResponseLlm {
            response: r#"{"outcome":"model_shortcoming","concept":"x","alConcept":"FlowField","description":"d","generatedCode":"g","correctPattern":"c","confidence":"medium"}"#.to_string(),
        };
        let prompt = ScriptedPrompt { decision: PromptDecision::Skip, calls: AtomicUsize::new(0) };
        let orchestrator = VerifyOrchestrator::new(
            llm,
            prompt,
            &shortcomings_dir,
            OrchestratorMode::All,
            1,
            None,
        );

        let summary = orchestrator.run(vec![task]).await;
        assert_eq!(summary.analyzed, 1);
        assert_eq!(summary.shortcomings, 1);
        assert!(shortcomings_dir.join("claude.json").exists());
    }

    #[tokio::test]
    async fn shortcomings_only_mode_never_applies_fixes() {
        let dir = tempfile::tempdir().unwrap();
        let task = failing_task(dir.path());
        let fix = ProposedFix {
            file_type: centralgauge_core::AffectedFileType::TaskYaml,
            file_path: PathBuf::from("unused"),
            description: "d".to_string(),
            code_before: "a".to_string(),
            code_after: "b".to_string(),
        };
        let llm = FixedResponseLlm {
            response: serde_json::json!({
                "outcome": "fixable",
                "category": "syntax_error",
                "description": "d",
                "affectedFile": "task_yaml",
                "fix": {"description": fix.description, "codeBefore": fix.code_before, "codeAfter": fix.code_after},
                "confidence": "medium",
            })
            .to_string(),
        };
        let prompt = ScriptedPrompt { decision: PromptDecision::Apply, calls: AtomicUsize::new(0) };
        let orchestrator = VerifyOrchestrator::new(
            llm,
            prompt,
            dir.path().join("shortcomings"),
            OrchestratorMode::ShortcomingsOnly,
            1,
            None,
        );

        let summary = orchestrator.run(vec![task]).await;
        assert_eq!(summary.fixed, 0);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn applies_fix_when_prompt_approves_in_all_mode() {
        let dir = tempfile::tempdir().unwrap();
        let task = failing_task(dir.path());
        let task_yaml_path = task.task_yaml_path.clone();

        let llm = FixedResponseLlm {
            response: serde_json::json!({
                "outcome": "fixable",
                "category": "syntax_error",
                "description": "fix the description field",
                "affectedFile": "task_yaml",
                "fix": {
                    "description": "d",
                    "codeBefore": "description: sample",
                    "codeAfter": "description: fixed",
                },
                "confidence": "high",
            })
            .to_string(),
        };
        let prompt = ScriptedPrompt { decision: PromptDecision::Apply, calls: AtomicUsize::new(0) };
        let orchestrator =
            VerifyOrchestrator::new(llm, prompt, dir.path().join("shortcomings"), OrchestratorMode::All, 1, None);

        let summary = orchestrator.run(vec![task]).await;
        assert_eq!(summary.fixed, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(std::fs::read_to_string(&task_yaml_path).unwrap(), "description: fixed");
    }

    struct ConcurrencyTrackingLlm {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl AnalysisLlm for ConcurrencyTrackingLlm {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, String> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(r#"{"outcome":"model_shortcoming","concept":"x","alConcept":"FlowField","description":"d","generatedCode":"g","correctPattern":"c","confidence":"medium"}"#.to_string())
        }
    }

    fn failing_task_named(dir: &Path, task_id: &str) -> FailingTask {
        let task_dir = dir.join(task_id);
        let task_yaml = task_dir.join("task.yml");
        let test_al = task_dir.join("test.al");
        let project_dir = task_dir.join("project");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(&task_yaml, "description: sample").unwrap();
        std::fs::write(&test_al, "codeunit 1 Test {}").unwrap();
        std::fs::write(project_dir.join("Codeunit1.al"), "codeunit 2 Thing {}").unwrap();

        FailingTask {
            task_id: TaskId::parse(task_id).unwrap(),
            difficulty: Difficulty::Easy,
            failure_type: FailureType::Compilation,
            model: "claude".to_string(),
            attempt: 1,
            compilation_errors: Some(vec![]),
            test_results: None,
            output: String::new(),
            task_yaml_path: task_yaml,
            test_al_path: test_al,
            generated_code_path: project_dir.to_string_lossy().into_owned(),
            session_id: "1".to_string(),
        }
    }

    #[tokio::test]
    async fn max_parallel_keeps_multiple_analyses_in_flight_at_once() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = vec![
            failing_task_named(dir.path(), "CG-AL-E008"),
            failing_task_named(dir.path(), "CG-AL-E009"),
            failing_task_named(dir.path(), "CG-AL-E010"),
        ];

        let llm = ConcurrencyTrackingLlm { in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) };
        let prompt = ScriptedPrompt { decision: PromptDecision::Skip, calls: AtomicUsize::new(0) };
        let orchestrator = VerifyOrchestrator::new(
            llm,
            prompt,
            dir.path().join("shortcomings"),
            OrchestratorMode::All,
            3,
            None,
        );

        let summary = orchestrator.run(tasks).await;
        assert_eq!(summary.analyzed, 3);
        let peak = orchestrator.llm.peak.load(Ordering::SeqCst);
        assert!(peak > 1, "expected more than one analysis in flight at once, got peak={peak}");
    }
}
