//! YAML loading and single-inheritance resolution for `AgentConfig`.

pub mod loader;
pub mod raw;
pub mod resolve;

pub use loader::AgentConfigStore;
pub use raw::{RawAgentConfig, RawLimits, RawMcpServer, RawSandbox, RawSystemPrompt};
pub use resolve::resolve as resolve_agent_config;
