//! Single-inheritance resolution: walk an `extends` chain to its root,
//! then fold parent → child so that child values win, with the one
//! documented asymmetry preserved: `allowedTools` replaces outright while
//! `mcpServers`, `sandbox`, and `limits` merge field/key-wise.

use std::collections::{BTreeMap, HashMap};

use centralgauge_core::{
    AgentConfig, ConfigError, ExecutionLimits, McpServerDescriptor, SandboxConfig,
    SystemPromptSpec,
};

use crate::raw::{RawAgentConfig, RawSystemPrompt};

fn convert_system_prompt(raw: RawSystemPrompt) -> SystemPromptSpec {
    match raw {
        RawSystemPrompt::Verbatim { text } => SystemPromptSpec::Verbatim { text },
        RawSystemPrompt::Preset { name, append } => SystemPromptSpec::Preset { name, append },
    }
}

/// Fold `child` on top of `parent`, applying the merge rules for each
/// field. `parent` is `None` at the root of an `extends` chain, in which
/// case every unset field falls back to `AgentConfig`'s defaults.
fn fold(parent: Option<&AgentConfig>, child: &RawAgentConfig) -> AgentConfig {
    let base_mcp: Vec<McpServerDescriptor> =
        parent.map(|p| p.mcp_servers.clone()).unwrap_or_default();
    let base_sandbox = parent.map(|p| p.sandbox.clone()).unwrap_or_default();
    let base_limits = parent.map(|p| p.limits).unwrap_or_default();

    let mcp_servers = merge_mcp_servers(base_mcp, &child.mcp_servers);
    let sandbox = SandboxConfig {
        enabled: child
            .sandbox
            .as_ref()
            .and_then(|s| s.enabled)
            .unwrap_or(base_sandbox.enabled),
        image: child
            .sandbox
            .as_ref()
            .and_then(|s| s.image.clone())
            .or(base_sandbox.image),
    };
    let limits = ExecutionLimits {
        max_compile_attempts: child
            .limits
            .as_ref()
            .and_then(|l| l.max_compile_attempts)
            .or(base_limits.max_compile_attempts),
        timeout_ms: child
            .limits
            .as_ref()
            .and_then(|l| l.timeout_ms)
            .unwrap_or(base_limits.timeout_ms),
    };

    AgentConfig {
        id: child.id.clone().or_else(|| parent.map(|p| p.id.clone())).unwrap_or_default(),
        name: child.name.clone().or_else(|| parent.map(|p| p.name.clone())).unwrap_or_default(),
        model: child.model.clone().or_else(|| parent.map(|p| p.model.clone())).unwrap_or_default(),
        max_turns: child.max_turns.or_else(|| parent.map(|p| p.max_turns)).unwrap_or(0),
        max_total_tokens: child
            .max_total_tokens
            .or_else(|| parent.and_then(|p| p.max_total_tokens)),
        allowed_tools: child
            .allowed_tools
            .clone()
            .unwrap_or_else(|| parent.map(|p| p.allowed_tools.clone()).unwrap_or_default()),
        mcp_servers,
        system_prompt: child
            .system_prompt
            .clone()
            .map(convert_system_prompt)
            .or_else(|| parent.and_then(|p| p.system_prompt.clone())),
        prompt_template: child
            .prompt_template
            .or_else(|| parent.map(|p| p.prompt_template))
            .unwrap_or_default(),
        tool_naming: child
            .tool_naming
            .or_else(|| parent.map(|p| p.tool_naming))
            .unwrap_or_default(),
        sandbox,
        limits,
        tags: child.tags.clone().unwrap_or_else(|| parent.map(|p| p.tags.clone()).unwrap_or_default()),
    }
}

/// `mcpServers` merges by `name`: a child entry with the same name
/// replaces the parent's, new names are appended, parent order is
/// otherwise preserved.
fn merge_mcp_servers(
    base: Vec<McpServerDescriptor>,
    overrides: &Option<Vec<crate::raw::RawMcpServer>>,
) -> Vec<McpServerDescriptor> {
    let Some(overrides) = overrides else {
        return base;
    };
    let mut by_name: BTreeMap<String, McpServerDescriptor> =
        base.into_iter().map(|d| (d.name.clone(), d)).collect();
    let mut order: Vec<String> = by_name.keys().cloned().collect();
    for raw in overrides {
        let descriptor = McpServerDescriptor {
            name: raw.name.clone(),
            command: raw.command.clone(),
            args: raw.args.clone(),
            env: raw.env.clone(),
        };
        if !by_name.contains_key(&raw.name) {
            order.push(raw.name.clone());
        }
        by_name.insert(raw.name.clone(), descriptor);
    }
    order.into_iter().filter_map(|name| by_name.remove(&name)).collect()
}

fn validate(config: &AgentConfig) -> Result<(), ConfigError> {
    if config.id.is_empty() {
        return Err(ConfigError::MissingField { id: config.id.clone(), field: "id" });
    }
    if config.name.is_empty() {
        return Err(ConfigError::MissingField { id: config.id.clone(), field: "name" });
    }
    if config.model.is_empty() {
        return Err(ConfigError::MissingField { id: config.id.clone(), field: "model" });
    }
    if config.max_turns == 0 {
        return Err(ConfigError::NonPositiveMaxTurns {
            id: config.id.clone(),
            max_turns: 0,
        });
    }
    if config.allowed_tools.is_empty() {
        return Err(ConfigError::EmptyAllowedTools { id: config.id.clone() });
    }
    Ok(())
}

/// Resolve `id` against the raw document table, walking `extends` to the
/// root and folding parent-to-child. Detects cycles and unknown parents.
pub fn resolve(id: &str, table: &HashMap<String, RawAgentConfig>) -> Result<AgentConfig, ConfigError> {
    let mut chain = Vec::new();
    let mut current = id.to_string();
    loop {
        if chain.contains(&current) {
            chain.push(current);
            return Err(ConfigError::InheritanceCycle { id: id.to_string(), chain });
        }
        let Some(raw) = table.get(&current) else {
            return Err(ConfigError::UnknownParent {
                id: chain.last().cloned().unwrap_or_else(|| id.to_string()),
                parent: current,
            });
        };
        chain.push(current.clone());
        match &raw.extends {
            Some(parent) => current = parent.clone(),
            None => break,
        }
    }

    let mut resolved: Option<AgentConfig> = None;
    for node_id in chain.into_iter().rev() {
        let raw = table.get(&node_id).expect("chain entries were validated to exist above");
        resolved = Some(fold(resolved.as_ref(), raw));
    }
    let resolved = resolved.expect("chain always has at least one node");
    validate(&resolved)?;
    Ok(resolved)
}
