//! Watch2Give Core: state record, stage graphs and the pipeline runner.
//!
//! A run threads one [`GiveState`] through a fixed sequence of stages. Each
//! stage is a tiny state machine ([`StageGraph`]) driven by [`run_graph`]; the
//! [`PipelineRunner`] selects each stage's inputs, merges the patch it returns
//! and hands the final record to a [`ResultSink`].

pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod runner;
pub mod sink;
pub mod stage;
pub mod state;
pub mod threshold;

pub use config::{load_config, W2gConfig};
pub use context::ExecutionContext;
pub use error::W2gError;
pub use graph::{run_graph, GraphNode, GraphRun, StageGraph, Transition};
pub use runner::{PipelineRun, PipelineRunner, StageReport};
pub use sink::ResultSink;
pub use stage::{Stage, StageError, StageOutput};
pub use state::{GiveState, PipelineInput, RewardStatus, TransferStatus, VaultAction};
pub use threshold::ThresholdTable;

/// Engine version reported by the API.
pub const W2G_VERSION: &str = "1.0.0";
