//! `CostTracker`: per-execution, mutable accounting of tokens, turns, and
//! tool-call timings.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

const COMPILE_TOOL_NAMES: &[&str] = &["mcp__centralgauge__compile", "compile_al"];
const TEST_TOOL_NAMES: &[&str] = &["mcp__centralgauge__test", "run_tests"];

fn is_compile_tool(name: &str) -> bool {
    COMPILE_TOOL_NAMES.contains(&name)
}

fn is_test_tool(name: &str) -> bool {
    TEST_TOOL_NAMES.contains(&name)
}

/// A single completed conversation turn's token and tool-call accounting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnRecord {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub tool_calls: Vec<String>,
}

/// Aggregate metrics exposed on `AgentExecutionResult`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CostMetrics {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub turns: usize,
    pub compile_attempts: u64,
    pub test_runs: u64,
}

/// Mutable per-execution accounting. Not `Clone`: an execution owns exactly
/// one tracker for its lifetime.
pub struct CostTracker {
    prompt_tokens: u64,
    completion_tokens: u64,
    turns: Vec<TurnRecord>,
    current_turn: Option<TurnRecord>,
    compile_attempts: u64,
    test_runs: u64,
    started_at: DateTime<Utc>,
    pending_tool_timers: HashMap<String, (Instant, String)>,
    tool_durations: HashMap<String, Duration>,
}

impl CostTracker {
    pub fn new() -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            turns: Vec::new(),
            current_turn: None,
            compile_attempts: 0,
            test_runs: 0,
            started_at: Utc::now(),
            pending_tool_timers: HashMap::new(),
            tool_durations: HashMap::new(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Start a new turn, auto-ending any turn already open.
    pub fn start_turn(&mut self) {
        self.end_turn();
        self.current_turn = Some(TurnRecord::default());
    }

    /// End the current turn, committing it to `turns`. A no-op if no turn
    /// is open.
    pub fn end_turn(&mut self) {
        if let Some(turn) = self.current_turn.take() {
            self.turns.push(turn);
        }
    }

    /// Record prompt/completion token usage. Global counters always update;
    /// the currently open turn (if any) also accumulates the usage.
    pub fn record_token_usage(&mut self, prompt_tokens: u64, completion_tokens: u64) {
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
        if let Some(turn) = self.current_turn.as_mut() {
            turn.prompt_tokens += prompt_tokens;
            turn.completion_tokens += completion_tokens;
        }
    }

    /// Record a tool invocation by name. Global compile/test counters
    /// always update regardless of whether a turn is open; the call is
    /// only attached to a turn record when one is open.
    pub fn record_tool_call(&mut self, name: &str) {
        if is_compile_tool(name) {
            self.compile_attempts += 1;
        }
        if is_test_tool(name) {
            self.test_runs += 1;
        }
        if let Some(turn) = self.current_turn.as_mut() {
            turn.tool_calls.push(name.to_string());
        }
    }

    /// Start a timer for a pending tool call keyed by its tool-use id.
    /// Each `tool_use` block in the message loop starts a pending timer.
    pub fn start_tool_timer(&mut self, tool_use_id: impl Into<String>, tool_name: impl Into<String>) {
        self.pending_tool_timers.insert(tool_use_id.into(), (Instant::now(), tool_name.into()));
    }

    /// Correlate a `tool_result` with its pending timer by id and add the
    /// elapsed duration to the per-tool aggregate.
    pub fn end_tool_timer(&mut self, tool_use_id: &str) {
        if let Some((started, tool_name)) = self.pending_tool_timers.remove(tool_use_id) {
            *self.tool_durations.entry(tool_name).or_default() += started.elapsed();
        }
    }

    pub fn tool_duration(&self, tool_name: &str) -> Duration {
        self.tool_durations.get(tool_name).copied().unwrap_or_default()
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn turns_completed(&self) -> usize {
        self.turns.len()
    }

    /// Total turns opened so far, including one still in progress. Used
    /// for the `turns >= maxTurns` termination check, which must not wait
    /// for the in-progress turn to end.
    pub fn turns_started(&self) -> usize {
        self.turns.len() + usize::from(self.current_turn.is_some())
    }

    pub fn compile_attempts(&self) -> u64 {
        self.compile_attempts
    }

    pub fn test_runs(&self) -> u64 {
        self.test_runs
    }

    pub fn metrics(&self) -> CostMetrics {
        CostMetrics {
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            total_tokens: self.total_tokens(),
            turns: self.turns_completed(),
            compile_attempts: self.compile_attempts,
            test_runs: self.test_runs,
        }
    }

    pub fn turns(&self) -> &[TurnRecord] {
        &self.turns
    }
}

impl Default for CostTracker {
    fn default() -> Self {
        Self::new()
    }
}
