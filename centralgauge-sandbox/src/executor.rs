//! Runs one `(task, agentConfig)` execution inside an isolated OS
//! container with an out-of-process tool server, per §4.2. Produces the
//! same `AgentExecutionResult` shape the local executor does.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use centralgauge_core::{
    AgentConfig, AgentExecutionResult, CostTracker, ExecutionId, FailurePhase, SandboxError,
    TaskManifest, TerminationReason,
};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::analyzer::analyze_sandbox_output;
use crate::container::{BindMount, ContainerProvider, ContainerSpec};
use crate::tool_server::{ToolServerManager, WorkspaceMapping};
use crate::workdir::prepare_execution_dir;

const CONTAINER_WORKSPACE_PATH: &str = r"C:\workspace";
const PROMPT_FILE_NAME: &str = ".agent-prompt.txt";

pub struct SandboxExecuteOptions {
    pub base_dir: PathBuf,
    pub image: String,
    pub tool_server_binary: String,
    pub tool_server_port: u16,
    pub timeout: Duration,
    pub api_key_env: String,
    /// Cooperative cancellation, mirroring the `abortSignal` every agent
    /// execution respects. Cancelling races the same way a timeout does.
    pub cancellation: CancellationToken,
}

/// Drives one container-backed execution to completion. Every exit path —
/// including an early `?`-propagated failure — destroys the container
/// and stops the tool server before returning.
pub struct SandboxExecutor<P: ContainerProvider> {
    provider: P,
}

impl<P: ContainerProvider> SandboxExecutor<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn execute(
        &self,
        agent_config: &AgentConfig,
        task: &TaskManifest,
        prompt: &str,
        options: &SandboxExecuteOptions,
    ) -> AgentExecutionResult {
        let execution_id = ExecutionId::new();
        let executed_at = Utc::now();
        let started = Instant::now();

        let exec_dir = match prepare_execution_dir(&options.base_dir, &task.id, execution_id) {
            Ok(dir) => dir,
            Err(err) => {
                warn!(error = %err, "failed to prepare sandbox execution directory");
                return Self::fatal_result(
                    agent_config,
                    task,
                    execution_id,
                    executed_at,
                    started,
                    FailurePhase::ContainerStartup,
                    "failed to prepare execution directory",
                );
            }
        };

        if !self.provider.is_available().await {
            return Self::fatal_result(
                agent_config,
                task,
                execution_id,
                executed_at,
                started,
                FailurePhase::ContainerStartup,
                "sandbox platform unavailable",
            );
        }

        self.provider.prune_stale().await;

        let prompt_path = exec_dir.join(PROMPT_FILE_NAME);
        if let Err(err) = std::fs::write(&prompt_path, prompt) {
            warn!(error = %err, "failed to write agent prompt file");
            return Self::fatal_result(
                agent_config,
                task,
                execution_id,
                executed_at,
                started,
                FailurePhase::ContainerStartup,
                "failed to write prompt file",
            );
        }

        let mut tool_server = ToolServerManager::new(&options.tool_server_binary);
        let mapping = WorkspaceMapping::new(
            CONTAINER_WORKSPACE_PATH,
            exec_dir.to_string_lossy().into_owned(),
        );
        if let Err(err) = tool_server.start(options.tool_server_port, Some(&mapping)).await {
            warn!(error = %err, "tool server failed to start");
            return Self::fatal_result(
                agent_config,
                task,
                execution_id,
                executed_at,
                started,
                FailurePhase::McpConnection,
                "tool server never became healthy",
            );
        }

        let mut env = BTreeMap::new();
        if let Ok(api_key) = std::env::var(&options.api_key_env) {
            env.insert(options.api_key_env.clone(), api_key);
        }
        env.insert(
            "AGENT_PROMPT_FILE".to_string(),
            format!("{CONTAINER_WORKSPACE_PATH}\\{PROMPT_FILE_NAME}"),
        );
        env.insert("MAX_TURNS".to_string(), agent_config.max_turns.to_string());
        env.insert("TIMEOUT_MS".to_string(), options.timeout.as_millis().to_string());
        env.insert(
            "TOOL_SERVER_URL".to_string(),
            format!("http://host.docker.internal:{}", options.tool_server_port),
        );

        let spec = ContainerSpec {
            name: format!("centralgauge-{task_id}-{execution_id}", task_id = task.id),
            image: options.image.clone(),
            bind_mounts: vec![BindMount {
                host_path: exec_dir.clone(),
                container_path: CONTAINER_WORKSPACE_PATH.to_string(),
            }],
            env,
        };

        let container_result = self.provider.create(spec).await;
        let result = match container_result {
            Ok(mut handle) => {
                let outcome = tokio::select! {
                    outcome = handle.wait_with_timeout(options.timeout) => outcome,
                    () = options.cancellation.cancelled() => None,
                };
                handle.destroy().await;
                outcome
            }
            Err(err) => {
                error!(error = %err, "container creation failed");
                None
            }
        };

        tool_server.stop().await;

        match result {
            None => Self::finish(
                agent_config,
                task,
                execution_id,
                executed_at,
                started,
                analyze_sandbox_output("", true),
            ),
            Some(output) => Self::finish(
                agent_config,
                task,
                execution_id,
                executed_at,
                started,
                analyze_sandbox_output(&output.combined_output, false),
            ),
        }
    }

    fn finish(
        agent_config: &AgentConfig,
        task: &TaskManifest,
        execution_id: ExecutionId,
        executed_at: chrono::DateTime<Utc>,
        started: Instant,
        analysis: crate::analyzer::SandboxOutputAnalysis,
    ) -> AgentExecutionResult {
        let success = analysis.success;
        let termination_reason = analysis.termination_reason;
        let test_result = analysis.tests.clone();
        let failure_details = if success { None } else { Some(analysis.into_failure_reason()) };

        AgentExecutionResult {
            task_id: task.id.clone(),
            agent_id: agent_config.id.clone(),
            execution_id,
            success,
            final_code: None,
            turns: 0,
            metrics: CostTracker::new().metrics(),
            termination_reason,
            duration: started.elapsed(),
            executed_at,
            test_result,
            result_summary: None,
            failure_details,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fatal_result(
        agent_config: &AgentConfig,
        task: &TaskManifest,
        execution_id: ExecutionId,
        executed_at: chrono::DateTime<Utc>,
        started: Instant,
        phase: FailurePhase,
        summary: &str,
    ) -> AgentExecutionResult {
        let termination_reason = if phase == FailurePhase::Timeout {
            TerminationReason::Timeout
        } else {
            TerminationReason::Error
        };
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
            failure_details: Some(centralgauge_core::DetailedFailureReason {
                termination_reason,
                phase,
                summary: summary.to_string(),
                compilation: None,
                tests: None,
                timeout_ms: None,
                container: None,
                failed_at: Utc::now(),
            }),
        }
    }
}

/// Surfaced so callers can distinguish a configuration-time error
/// (unreachable tool server binary, missing image) from a per-execution
/// outcome. Not used by `execute`, which never propagates — kept for
/// preflight checks a binary may want to run before starting a batch.
pub fn validate_options(options: &SandboxExecuteOptions) -> Result<(), SandboxError> {
    if options.image.trim().is_empty() {
        return Err(SandboxError::Container("no sandbox image configured".to_string()));
    }
    if options.tool_server_binary.trim().is_empty() {
        return Err(SandboxError::Container("no tool server binary configured".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerHandle, ContainerOutput};
    use async_trait::async_trait;
    use centralgauge_core::{
        ExecutionLimits, ExpectedOutcome, PromptTemplate, SandboxConfig, TaskId, ToolNamingStyle,
    };
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct FakeHandle {
        output: Option<ContainerOutput>,
        destroyed: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl ContainerHandle for FakeHandle {
        async fn wait_with_timeout(&mut self, _timeout: Duration) -> Option<ContainerOutput> {
            self.output.take()
        }

        async fn destroy(&mut self) {
            *self.destroyed.lock().await = true;
        }
    }

    struct FakeProvider {
        available: bool,
        output: String,
        destroyed: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl ContainerProvider for FakeProvider {
        async fn is_available(&self) -> bool {
            self.available
        }

        async fn prune_stale(&self) {}

        async fn create(
            &self,
            _spec: ContainerSpec,
        ) -> Result<Box<dyn ContainerHandle>, String> {
            Ok(Box::new(FakeHandle {
                output: Some(ContainerOutput { combined_output: self.output.clone(), exit_code: Some(0) }),
                destroyed: self.destroyed.clone(),
            }))
        }
    }

    fn agent_config() -> AgentConfig {
        AgentConfig {
            id: "claude-sandbox".to_string(),
            name: "Claude sandbox".to_string(),
            model: "claude-sonnet".to_string(),
            max_turns: 10,
            max_total_tokens: None,
            allowed_tools: vec!["al_compile".to_string()],
            mcp_servers: Vec::new(),
            system_prompt: None,
            prompt_template: PromptTemplate::Universal,
            tool_naming: ToolNamingStyle::Generic,
            sandbox: SandboxConfig { enabled: true, image: Some("bc-image:27".to_string()) },
            limits: ExecutionLimits::default(),
            tags: Vec::new(),
        }
    }

    fn task() -> TaskManifest {
        TaskManifest {
            id: TaskId::parse("CG-AL-E008").unwrap(),
            description: "Create a simple table extension".to_string(),
            expected: ExpectedOutcome { compile: true, test_app: None },
        }
    }

    #[tokio::test]
    async fn reports_container_startup_failure_when_platform_unavailable() {
        let provider = FakeProvider {
            available: false,
            output: String::new(),
            destroyed: Arc::new(Mutex::new(false)),
        };
        let executor = SandboxExecutor::new(provider);
        let base = tempfile::tempdir().unwrap();
        let options = SandboxExecuteOptions {
            base_dir: base.path().to_path_buf(),
            image: "bc-image:27".to_string(),
            tool_server_binary: "/nonexistent/al-tools-server".to_string(),
            tool_server_port: 0,
            timeout: Duration::from_secs(1),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            cancellation: CancellationToken::new(),
        };
        let result = executor.execute(&agent_config(), &task(), "prompt text", &options).await;
        assert!(!result.success);
        assert_eq!(result.failure_details.unwrap().phase, FailurePhase::ContainerStartup);
    }

    #[test]
    fn validate_options_rejects_blank_image() {
        let options = SandboxExecuteOptions {
            base_dir: PathBuf::from("/tmp"),
            image: "".to_string(),
            tool_server_binary: "al-tools-server".to_string(),
            tool_server_port: 8080,
            timeout: Duration::from_secs(1),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            cancellation: CancellationToken::new(),
        };
        assert!(validate_options(&options).is_err());
    }
}
