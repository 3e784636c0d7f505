//! Manages the single out-of-process tool server used by a sandboxed
//! agent. One instance per running task; callers must `stop` before
//! `start`ing a new workspace mapping.

use std::time::Duration;

use centralgauge_core::{AgentConfig, McpServerDescriptor, SandboxError};
use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{debug, info, warn};

const HEALTH_CHECK_ATTEMPTS: u32 = 30;
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(500);
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// A `<container-path>=<host-path>` workspace mapping, so the tool server
/// can translate paths the sandboxed agent writes inside the container
/// back onto the host task directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceMapping {
    pub container_path: String,
    pub host_path: String,
}

impl WorkspaceMapping {
    pub fn new(container_path: impl Into<String>, host_path: impl Into<String>) -> Self {
        Self { container_path: container_path.into(), host_path: host_path.into() }
    }

    pub fn as_arg(&self) -> String {
        format!("{}={}", self.container_path, self.host_path)
    }
}

/// Owns the tool-server binary's child process. Only one server per
/// manager is supported at a time.
pub struct ToolServerManager {
    binary: String,
    client: reqwest::Client,
    child: Option<Child>,
    port: Option<u16>,
}

impl ToolServerManager {
    pub fn new(binary: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HEALTH_CHECK_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { binary: binary.into(), client, child: None, port: None }
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Spawn `<binary> --http --port <port> [--workspace-map <mapping>]`,
    /// discard its stdio to avoid pipe back-pressure, then poll
    /// `GET /health` up to 30 times at 500ms spacing. Kills the spawned
    /// child before returning if every poll fails.
    pub async fn start(
        &mut self,
        port: u16,
        workspace_mapping: Option<&WorkspaceMapping>,
    ) -> Result<(), SandboxError> {
        let mut command = Command::new(&self.binary);
        command.arg("--http").arg("--port").arg(port.to_string());
        if let Some(mapping) = workspace_mapping {
            command.arg("--workspace-map").arg(mapping.as_arg());
        }
        command.stdin(std::process::Stdio::null());
        command.stdout(std::process::Stdio::null());
        command.stderr(std::process::Stdio::null());

        let mut child = command
            .spawn()
            .map_err(|source| SandboxError::Io { path: self.binary.clone().into(), source })?;

        let health_url = format!("http://127.0.0.1:{port}/health");
        for attempt in 1..=HEALTH_CHECK_ATTEMPTS {
            match self.client.get(&health_url).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(port, attempt, "tool server is healthy");
                    self.child = Some(child);
                    self.port = Some(port);
                    return Ok(());
                }
                Ok(response) => {
                    debug!(port, attempt, status = %response.status(), "tool server not yet healthy");
                }
                Err(err) => {
                    debug!(port, attempt, error = %err, "tool server health check failed");
                }
            }
            sleep(HEALTH_CHECK_INTERVAL).await;
        }

        warn!(port, "tool server never became healthy; killing spawned process");
        let _ = child.kill().await;
        Err(SandboxError::ToolServerUnhealthy { attempts: HEALTH_CHECK_ATTEMPTS })
    }

    /// Best-effort stop: tolerates an already-dead process.
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill().await {
                debug!(error = %err, "tool server already exited");
            }
            let _ = child.wait().await;
        }
        self.port = None;
    }
}

impl Drop for ToolServerManager {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
        }
    }
}

/// Build the declarative process descriptors an SDK that spawns its own
/// local tool servers needs, for the non-sandbox execution path.
pub fn build_servers_config(agent_config: &AgentConfig) -> Vec<McpServerDescriptor> {
    agent_config.mcp_servers.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_mapping_formats_as_container_equals_host() {
        let mapping = WorkspaceMapping::new(r"C:\workspace", "/tmp/task-123");
        assert_eq!(mapping.as_arg(), r"C:\workspace=/tmp/task-123");
    }

    #[test]
    fn fresh_manager_reports_not_running() {
        let manager = ToolServerManager::new("al-tools-server");
        assert!(!manager.is_running());
    }

    #[tokio::test]
    async fn start_with_unreachable_binary_returns_io_error() {
        let mut manager = ToolServerManager::new("/nonexistent/al-tools-server-binary");
        let result = manager.start(49_999, None).await;
        assert!(result.is_err());
        assert!(!manager.is_running());
    }
}
