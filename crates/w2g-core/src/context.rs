//! Execution Context: per-run identity and logging capability
use chrono::{DateTime, Utc};
use tracing::Span;

/// Default cap on graph transitions within a single stage.
pub const DEFAULT_MAX_GRAPH_STEPS: usize = 32;

/// Request-scoped context created by the orchestrator for one run.
///
/// The context owns the run's tracing span; stage graphs open their own spans
/// as children of it, so every log line emitted by a stage carries both the
/// run id and the stage id.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub max_graph_steps: usize,
    span: Span,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::with_max_steps(DEFAULT_MAX_GRAPH_STEPS)
    }

    pub fn with_max_steps(max_graph_steps: usize) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("run", run_id = %run_id);
        Self {
            run_id,
            started_at: Utc::now(),
            max_graph_steps,
            span,
        }
    }

    /// Span under which all stage logging for this run is recorded.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
