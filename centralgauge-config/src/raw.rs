//! The as-written YAML shape: every field optional so a child document
//! only needs to state what it overrides from its `extends` parent.

use std::collections::BTreeMap;

use centralgauge_core::{PromptTemplate, ToolNamingStyle};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RawMcpServer {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawSystemPrompt {
    Verbatim { text: String },
    Preset { name: String, append: Option<String> },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSandbox {
    pub enabled: Option<bool>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLimits {
    #[serde(rename = "maxCompileAttempts")]
    pub max_compile_attempts: Option<usize>,
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: Option<u64>,
}

/// One YAML document under `agents/<id>.yml`. Unset optional fields are
/// inherited from the `extends` parent (or from `AgentConfig`'s defaults
/// at the root of the chain).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAgentConfig {
    pub id: Option<String>,
    pub name: Option<String>,
    pub model: Option<String>,
    pub extends: Option<String>,
    #[serde(rename = "maxTurns")]
    pub max_turns: Option<usize>,
    #[serde(rename = "maxTotalTokens")]
    pub max_total_tokens: Option<usize>,
    #[serde(rename = "allowedTools")]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(rename = "mcpServers")]
    pub mcp_servers: Option<Vec<RawMcpServer>>,
    #[serde(rename = "systemPrompt")]
    pub system_prompt: Option<RawSystemPrompt>,
    #[serde(rename = "promptTemplate")]
    pub prompt_template: Option<PromptTemplate>,
    #[serde(rename = "toolNaming")]
    pub tool_naming: Option<ToolNamingStyle>,
    pub sandbox: Option<RawSandbox>,
    pub limits: Option<RawLimits>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}
