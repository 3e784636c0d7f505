//! The bounded multi-turn agent execution loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use centralgauge_core::{
    AgentConfig, AgentExecutionResult, CostTracker, DetailedFailureReason, ExecutionId,
    FailurePhase, ResultSummary, TaskManifest, TerminationReason,
};
use chrono::Utc;
use tracing::{info, warn};

use crate::message::{AgentMessage, AgentMessageSource, ContentBlock, ResultSubtype};
use crate::prompt::build_prompt;
use crate::success::{detect_success, extract_compile_status, extract_test_stats};
use crate::workdir::prepare_execution_dir;

/// Classifies a non-success termination into a `DetailedFailureReason`.
/// The sandbox crate supplies a full implementation backed by its output
/// analyzer; outside sandbox mode this falls back to `DefaultFailureClassifier`.
pub trait FailureClassifier: Send + Sync {
    fn classify(&self, termination_reason: TerminationReason, aggregated_output: &str) -> DetailedFailureReason;
}

pub struct DefaultFailureClassifier;

impl FailureClassifier for DefaultFailureClassifier {
    fn classify(&self, termination_reason: TerminationReason, _aggregated_output: &str) -> DetailedFailureReason {
        DetailedFailureReason {
            termination_reason,
            phase: FailurePhase::Unknown,
            summary: "no failure analyzer configured for this execution path".to_string(),
            compilation: None,
            tests: None,
            timeout_ms: None,
            container: None,
            failed_at: Utc::now(),
        }
    }
}

pub struct ExecuteOptions {
    pub base_dir: PathBuf,
    pub classifier: Arc<dyn FailureClassifier>,
}

impl ExecuteOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), classifier: Arc::new(DefaultFailureClassifier) }
    }
}

fn map_result_subtype(subtype: ResultSubtype, success_observed: bool) -> TerminationReason {
    if success_observed {
        return TerminationReason::Success;
    }
    match subtype {
        ResultSubtype::Success => TerminationReason::Success,
        ResultSubtype::ErrorMaxTurns => TerminationReason::MaxTurns,
        ResultSubtype::ErrorDuringExecution => TerminationReason::Error,
        ResultSubtype::ErrorMaxBudgetUsd => TerminationReason::MaxTokens,
    }
}

fn build_result_summary(aggregated_output: &str, requires_tests: bool) -> ResultSummary {
    let compile_success = extract_compile_status(aggregated_output)
        .unwrap_or_else(|| crate::success::detect_compile_success_pattern(aggregated_output));
    if requires_tests {
        if let Some((passed, total)) = extract_test_stats(aggregated_output) {
            return ResultSummary::with_tests(compile_success, passed, total);
        }
    }
    ResultSummary::compile_only(compile_success)
}

/// Drives one `(task, agentConfig)` execution to completion. Never
/// returns an error: every failure mode is folded into the returned
/// `AgentExecutionResult`.
pub struct AgentExecutor;

impl AgentExecutor {
    pub async fn execute(
        agent_config: &AgentConfig,
        task: &TaskManifest,
        mut source: impl AgentMessageSource,
        options: &ExecuteOptions,
    ) -> AgentExecutionResult {
        let execution_id = ExecutionId::new();
        let executed_at = Utc::now();
        let started = Instant::now();

        let exec_dir = match prepare_execution_dir(&options.base_dir, &task.id, execution_id) {
            Ok(dir) => dir,
            Err(err) => {
                warn!(error = %err, "failed to prepare execution directory");
                return Self::error_result(
                    agent_config,
                    task,
                    execution_id,
                    executed_at,
                    started,
                    TerminationReason::Error,
                    &options.classifier,
                    "",
                );
            }
        };

        let workspace_path = exec_dir.to_string_lossy().into_owned();
        let requires_tests = task.requires_tests();
        let _prompt = build_prompt(
            agent_config.prompt_template,
            agent_config.tool_naming,
            task,
            &workspace_path,
        );

        let mut cost_tracker = CostTracker::new();
        let mut aggregated_output = String::new();
        let mut success_observed = false;
        let mut termination_reason = TerminationReason::Error;

        loop {
            let Some(message) = source.next().await else {
                termination_reason = TerminationReason::Error;
                break;
            };

            match message {
                AgentMessage::SystemInit { tools, tool_server_healthy } => {
                    info!(?tools, tool_server_healthy, "agent reported available tools");
                    continue;
                }
                AgentMessage::Assistant { usage, content } => {
                    cost_tracker.start_turn();
                    if let Some(usage) = usage {
                        cost_tracker.record_token_usage(usage.input_tokens, usage.output_tokens);
                    }
                    for block in &content {
                        if let ContentBlock::ToolUse { id, name, .. } = block {
                            cost_tracker.record_tool_call(name);
                            cost_tracker.start_tool_timer(id.clone(), name.clone());
                        }
                    }
                }
                AgentMessage::User { content } => {
                    for block in &content {
                        if let ContentBlock::ToolResult { tool_use_id, .. } = block {
                            cost_tracker.end_tool_timer(tool_use_id);
                        }
                    }
                    let text = AgentMessage::User { content }.textual_payload();
                    if !text.is_empty() {
                        aggregated_output.push('\n');
                        aggregated_output.push_str(&text);
                    }
                    success_observed = detect_success(&aggregated_output, requires_tests).success;
                }
                AgentMessage::Result { subtype } => {
                    termination_reason = map_result_subtype(subtype, success_observed);
                    break;
                }
            }

            if cost_tracker.turns_started() >= agent_config.max_turns {
                termination_reason = TerminationReason::MaxTurns;
                break;
            }
            if let Some(max_tokens) = agent_config.max_total_tokens {
                if cost_tracker.total_tokens() as usize >= max_tokens {
                    termination_reason = TerminationReason::MaxTokens;
                    break;
                }
            }
            if let Some(max_compile_attempts) = agent_config.limits.max_compile_attempts {
                if cost_tracker.compile_attempts() as usize >= max_compile_attempts {
                    termination_reason = TerminationReason::MaxCompileAttempts;
                    break;
                }
            }
            if success_observed {
                termination_reason = TerminationReason::Success;
                break;
            }
        }

        cost_tracker.end_turn();
        let success = termination_reason == TerminationReason::Success;
        let result_summary = if aggregated_output.is_empty() {
            None
        } else {
            Some(build_result_summary(&aggregated_output, requires_tests))
        };
        let failure_details = if success {
            None
        } else {
            Some(options.classifier.classify(termination_reason, &aggregated_output))
        };

        AgentExecutionResult {
            task_id: task.id.clone(),
            agent_id: agent_config.id.clone(),
            execution_id,
            success,
            final_code: None,
            turns: cost_tracker.turns_completed(),
            metrics: cost_tracker.metrics(),
            termination_reason,
            duration: started.elapsed(),
            executed_at,
            test_result: result_summary.as_ref().and_then(|summary| {
                summary.tests_passed.zip(summary.tests_total).map(|(passed, total)| {
                    centralgauge_core::TestOutcome { passed, total, failures: Vec::new() }
                })
            }),
            result_summary,
            failure_details,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn error_result(
        agent_config: &AgentConfig,
        task: &TaskManifest,
        execution_id: ExecutionId,
        executed_at: chrono::DateTime<Utc>,
        started: Instant,
        termination_reason: TerminationReason,
        classifier: &Arc<dyn FailureClassifier>,
        aggregated_output: &str,
    ) -> AgentExecutionResult {
        AgentExecutionResult {
            task_id: task.id.clone(),
            agent_id: agent_config.id.clone(),
            execution_id,
            success: false,
            final_code: None,
            turns: 0,
            metrics: CostTracker::new().metrics(),
            termination_reason,
            duration: started.elapsed(),
            executed_at,
            test_result: None,
            result_summary: None,
            failure_details: Some(classifier.classify(termination_reason, aggregated_output)),
        }
    }
}
