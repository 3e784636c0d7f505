//! The failure-analysis orchestrator: parses a benchmark run's debug
//! directory, asks the configured LLM to classify each final failure,
//! applies fixes under interactive review, and deduplicates model
//! knowledge gaps into a per-model catalog, per §4.4/§4.7/§4.9.

pub mod debug_log;
pub mod orchestrator;
pub mod prompt;
pub mod shortcomings;

pub use debug_log::{collect_failing_tasks, discover_sessions};
pub use orchestrator::{
    EventSink, InteractionPrompt, OrchestratorEvent, OrchestratorMode, OrchestratorSummary,
    PromptDecision, VerifyOrchestrator,
};
pub use prompt::{build_analysis_prompt, parse_analysis_response, system_instruction, AnalysisLlm};
pub use shortcomings::ShortcomingsTracker;
