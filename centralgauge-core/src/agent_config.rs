//! Resolved `AgentConfig`: the fully-inherited, cached description of one
//! agent variant. YAML loading and the inheritance resolver live in
//! `centralgauge-config`; this module only defines the shape callers
//! consume once resolution is complete.

use serde::{Deserialize, Serialize};

/// Which prompt template the agent executor assembles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptTemplate {
    Universal,
    Legacy,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        PromptTemplate::Universal
    }
}

/// Tool-naming convention the prompt and tool router use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolNamingStyle {
    Generic,
    Mcp,
}

impl Default for ToolNamingStyle {
    fn default() -> Self {
        ToolNamingStyle::Generic
    }
}

impl ToolNamingStyle {
    /// Resolve the compile tool name the prompt should reference.
    pub fn compile_tool_name(self) -> &'static str {
        match self {
            ToolNamingStyle::Generic => "al_compile",
            ToolNamingStyle::Mcp => "mcp__al-tools__al_compile",
        }
    }

    /// Resolve the verify tool name the prompt should reference.
    pub fn verify_tool_name(self) -> &'static str {
        match self {
            ToolNamingStyle::Generic => "al_verify_task",
            ToolNamingStyle::Mcp => "mcp__al-tools__al_verify_task",
        }
    }
}

/// Either a verbatim system prompt or a reference to the built-in
/// `claude_code` preset with an optional appended suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SystemPromptSpec {
    Verbatim { text: String },
    Preset { name: String, append: Option<String> },
}

/// A declarative process descriptor for an MCP/tool-server the agent may
/// use, matching the shape `ToolServerManager::build_servers_config` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpServerDescriptor {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: std::collections::BTreeMap<String, String>,
}

/// Sandbox execution block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxConfig {
    pub enabled: bool,
    pub image: Option<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            image: None,
        }
    }
}

/// Execution resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutionLimits {
    pub max_compile_attempts: Option<usize>,
    pub timeout_ms: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_compile_attempts: None,
            timeout_ms: 300_000,
        }
    }
}

/// Fully resolved, single-inheritance-chain-merged agent configuration.
/// Immutable and cached by id once resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub model: String,
    pub max_turns: usize,
    pub max_total_tokens: Option<usize>,
    pub allowed_tools: Vec<String>,
    pub mcp_servers: Vec<McpServerDescriptor>,
    pub system_prompt: Option<SystemPromptSpec>,
    pub prompt_template: PromptTemplate,
    pub tool_naming: ToolNamingStyle,
    pub sandbox: SandboxConfig,
    pub limits: ExecutionLimits,
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_naming_styles_resolve_distinct_names() {
        assert_eq!(ToolNamingStyle::Generic.compile_tool_name(), "al_compile");
        assert_eq!(ToolNamingStyle::Mcp.compile_tool_name(), "mcp__al-tools__al_compile");
        assert_eq!(ToolNamingStyle::Generic.verify_tool_name(), "al_verify_task");
        assert_eq!(ToolNamingStyle::Mcp.verify_tool_name(), "mcp__al-tools__al_verify_task");
    }

    #[test]
    fn defaults_match_the_conservative_baseline() {
        assert_eq!(PromptTemplate::default(), PromptTemplate::Universal);
        assert_eq!(ToolNamingStyle::default(), ToolNamingStyle::Generic);
        assert!(!SandboxConfig::default().enabled);
        assert_eq!(ExecutionLimits::default().timeout_ms, 300_000);
        assert_eq!(ExecutionLimits::default().max_compile_attempts, None);
    }

    #[test]
    fn system_prompt_spec_distinguishes_verbatim_from_preset() {
        let verbatim = SystemPromptSpec::Verbatim { text: "do the thing".to_string() };
        let preset = SystemPromptSpec::Preset { name: "claude_code".to_string(), append: None };
        assert_ne!(verbatim, preset);
    }
}
