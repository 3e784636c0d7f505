//! The sandbox execution path: a container-backed `(task, agentConfig)`
//! executor, its out-of-process tool-server manager, the abstract
//! container-provider interface, and the pure-function output analyzer
//! shared with the agent crate's sandbox failure classifier.

pub mod analyzer;
pub mod container;
pub mod executor;
pub mod success_patterns;
pub mod tool_server;
pub mod workdir;

pub use analyzer::{analyze_sandbox_output, SandboxOutputAnalysis};
pub use container::{BindMount, ContainerHandle, ContainerOutput, ContainerProvider, ContainerSpec};
pub use executor::{validate_options, SandboxExecuteOptions, SandboxExecutor};
pub use tool_server::{build_servers_config, ToolServerManager, WorkspaceMapping};
pub use workdir::prepare_execution_dir;
