//! Data model shared by every CentralGauge component: task/agent
//! descriptors, cost accounting, execution outcomes, and the typed errors
//! returned at each component boundary.

pub mod agent_config;
pub mod cost;
pub mod error;
pub mod ids;
pub mod pricing;
pub mod result;
pub mod task;

pub use agent_config::{
    AgentConfig, ExecutionLimits, McpServerDescriptor, PromptTemplate, SandboxConfig,
    SystemPromptSpec, ToolNamingStyle,
};
pub use cost::{CostMetrics, CostTracker, TurnRecord};
pub use error::{ConfigError, FixError, SandboxError, VerifyError};
pub use pricing::{EnginePricingTable, Pricing, PricingTable, Provider};
pub use ids::{Difficulty, ExecutionId, TaskId, TaskIdError};
pub use result::{
    AffectedFileType, AgentExecutionResult, AnalysisResult, CompilationError, Confidence,
    DetailedFailureReason, FailingTask, FailurePhase, FailureType, FixCategory, PassFail,
    ProposedFix, ResultSummary, ShortcomingEntry, ShortcomingsFile, TerminationReason,
    TestFailure, TestOutcome,
};
pub use task::{ExpectedOutcome, TaskManifest};
