//! Stage Trait: the contract every pipeline stage implements
use crate::context::ExecutionContext;
use crate::state::GiveState;

/// A pipeline stage as seen by the orchestrator.
///
/// A stage reads only the fields it declares in [`Stage::inputs`] from the
/// accumulated record and returns a patch holding the fields it produced.
pub trait Stage: Send + Sync {
    /// Unique stage id (ex: "give_router")
    fn id(&self) -> &'static str;

    /// Record fields this stage selects as its input
    fn inputs(&self) -> &'static [&'static str];

    /// Whether the stage is deterministic (default: true)
    fn deterministic(&self) -> bool {
        true
    }

    /// Runs the stage against the record projected to its declared inputs
    fn run(&self, state: &GiveState, ctx: &ExecutionContext) -> Result<StageOutput, StageError>;
}

/// What a stage hands back to the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    /// Fields produced by the stage, merged into the record by the runner.
    pub patch: GiveState,
    /// Graph nodes visited, in order.
    pub path: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    MissingInput(&'static str),
    StepLimit { graph: &'static str, limit: usize },
    ExecutionFailed(String),
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::MissingInput(field) => write!(f, "INPUT/MISSING: {}", field),
            Self::StepLimit { graph, limit } => {
                write!(f, "GRAPH/STEP_LIMIT: {} exceeded {} steps", graph, limit)
            }
            Self::ExecutionFailed(msg) => write!(f, "STAGE/EXEC: {}", msg),
        }
    }
}

impl std::error::Error for StageError {}

/// Pulls a required input field out of the record.
pub fn require<T: Clone>(value: &Option<T>, field: &'static str) -> Result<T, StageError> {
    value.clone().ok_or(StageError::MissingInput(field))
}
