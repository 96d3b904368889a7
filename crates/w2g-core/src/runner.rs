//! Pipeline Runner: chains stages, merging each patch into the running record
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::context::ExecutionContext;
use crate::error::W2gError;
use crate::sink::ResultSink;
use crate::stage::Stage;
use crate::state::{GiveState, PipelineInput};

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub id: String,
    pub in_hash: String,
    pub out_hash: String,
    pub deterministic: bool,
    pub latency_ms: u64,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: String,
    pub pipeline_id: String,
    pub state: GiveState,
    pub stages: Vec<StageReport>,
    pub recorded: bool,
}

pub struct PipelineRunner {
    stages: Vec<Arc<dyn Stage>>,
    pipeline_id: String,
}

impl PipelineRunner {
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        let pipeline_id = stages
            .iter()
            .map(|s| s.id())
            .collect::<Vec<_>>()
            .join("→");

        Self { stages, pipeline_id }
    }

    /// Runs every stage in order against a fresh record built from `input`.
    ///
    /// Each stage sees only the fields named by its [`Stage::inputs`].
    pub fn run(&self, input: PipelineInput, ctx: &ExecutionContext) -> Result<PipelineRun, W2gError> {
        let _enter = ctx.span().enter();
        tracing::info!(pipeline = %self.pipeline_id, "new run started");

        let mut state = GiveState::from(input);
        let mut reports = Vec::with_capacity(self.stages.len());
        let total = self.stages.len();

        for (idx, stage) in self.stages.iter().enumerate() {
            tracing::info!(
                inputs = ?stage.inputs(),
                "[{}/{}] running {}",
                idx + 1,
                total,
                stage.id()
            );
            let start = Instant::now();
            let in_hash = hash_state(&state)?;

            let view = state.select(stage.inputs());
            let output = stage.run(&view, ctx)?;
            state = state.merge(output.patch);

            let out_hash = hash_state(&state)?;
            let latency_ms = start.elapsed().as_millis() as u64;

            reports.push(StageReport {
                id: stage.id().to_string(),
                in_hash,
                out_hash,
                deterministic: stage.deterministic(),
                latency_ms,
                path: output.path.iter().map(|n| n.to_string()).collect(),
            });
        }

        tracing::info!("run complete");
        Ok(PipelineRun {
            run_id: ctx.run_id.clone(),
            pipeline_id: self.pipeline_id.clone(),
            state,
            stages: reports,
            recorded: false,
        })
    }

    /// Runs the pipeline, then appends the final record to `sink`.
    ///
    /// A sink failure is logged and reported through `recorded`; it never
    /// fails the run.
    pub fn run_and_record(
        &self,
        input: PipelineInput,
        sink: &dyn ResultSink,
        ctx: &ExecutionContext,
    ) -> Result<PipelineRun, W2gError> {
        let mut run = self.run(input, ctx)?;

        let _enter = ctx.span().enter();
        match sink.append(&run.state) {
            Ok(()) => {
                tracing::info!("result saved");
                run.recorded = true;
            }
            Err(e) => tracing::error!(error = %e, "failed to save result"),
        }
        Ok(run)
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

fn hash_state(state: &GiveState) -> Result<String, W2gError> {
    let bytes = serde_json::to_vec(state)?;
    Ok(format!("blake3:{}", blake3::hash(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{require, StageError, StageOutput};
    use crate::state::TransferStatus;
    use std::sync::Mutex;

    struct MarkTransferred;

    impl Stage for MarkTransferred {
        fn id(&self) -> &'static str {
            "mark"
        }

        fn inputs(&self) -> &'static [&'static str] {
            &["tokens"]
        }

        fn run(&self, state: &GiveState, _ctx: &ExecutionContext) -> Result<StageOutput, StageError> {
            require(&state.tokens, "tokens")?;
            Ok(StageOutput {
                patch: GiveState {
                    status: Some(TransferStatus::Transferred),
                    ..GiveState::default()
                },
                path: vec!["mark"],
            })
        }
    }

    struct NeedsScore;

    impl Stage for NeedsScore {
        fn id(&self) -> &'static str {
            "needs_score"
        }

        fn inputs(&self) -> &'static [&'static str] {
            &["score"]
        }

        fn run(&self, state: &GiveState, _ctx: &ExecutionContext) -> Result<StageOutput, StageError> {
            require(&state.score, "score")?;
            Ok(StageOutput::default())
        }
    }

    /// Declares `tokens` but tries to read `vendor_id` too.
    struct PeeksVendor;

    impl Stage for PeeksVendor {
        fn id(&self) -> &'static str {
            "peek"
        }

        fn inputs(&self) -> &'static [&'static str] {
            &["tokens"]
        }

        fn run(&self, state: &GiveState, _ctx: &ExecutionContext) -> Result<StageOutput, StageError> {
            require(&state.tokens, "tokens")?;
            require(&state.vendor_id, "vendor_id")?;
            Ok(StageOutput::default())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        records: Mutex<Vec<GiveState>>,
    }

    impl ResultSink for MemorySink {
        fn append(&self, record: &GiveState) -> Result<(), W2gError> {
            self.records
                .lock()
                .map_err(|e| W2gError::Sink(e.to_string()))?
                .push(record.clone());
            Ok(())
        }
    }

    struct BrokenSink;

    impl ResultSink for BrokenSink {
        fn append(&self, _record: &GiveState) -> Result<(), W2gError> {
            Err(W2gError::Sink("disk full".to_string()))
        }
    }

    fn input() -> PipelineInput {
        PipelineInput {
            tokens: 20,
            vendor_id: "vendor_456".to_string(),
            viewer_id: "user_123".to_string(),
            verified_gives: 22,
            photo_path: None,
        }
    }

    #[test]
    fn merges_stage_patches_and_reports() {
        let runner = PipelineRunner::new(vec![Arc::new(MarkTransferred)]);
        let run = runner.run(input(), &ExecutionContext::new()).unwrap();

        assert_eq!(run.state.status, Some(TransferStatus::Transferred));
        assert_eq!(run.state.tokens, Some(20));
        assert_eq!(run.stages.len(), 1);
        assert_ne!(run.stages[0].in_hash, run.stages[0].out_hash);
        assert_eq!(run.stages[0].path, vec!["mark"]);
    }

    #[test]
    fn pipeline_id_joins_stage_ids() {
        let runner = PipelineRunner::new(vec![Arc::new(MarkTransferred), Arc::new(NeedsScore)]);
        assert_eq!(runner.pipeline_id(), "mark→needs_score");
        assert_eq!(runner.len(), 2);
    }

    #[test]
    fn missing_input_fails_the_run() {
        let runner = PipelineRunner::new(vec![Arc::new(NeedsScore)]);
        let err = runner.run(input(), &ExecutionContext::new()).unwrap_err();
        assert!(matches!(err, W2gError::Stage(StageError::MissingInput("score"))));
    }

    #[test]
    fn stages_only_see_declared_inputs() {
        let runner = PipelineRunner::new(vec![Arc::new(PeeksVendor)]);
        let err = runner.run(input(), &ExecutionContext::new()).unwrap_err();
        assert!(matches!(err, W2gError::Stage(StageError::MissingInput("vendor_id"))));
    }

    #[test]
    fn run_and_record_appends_final_state() {
        let runner = PipelineRunner::new(vec![Arc::new(MarkTransferred)]);
        let sink = MemorySink::default();
        let run = runner
            .run_and_record(input(), &sink, &ExecutionContext::new())
            .unwrap();

        assert!(run.recorded);
        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], run.state);
    }

    #[test]
    fn sink_failure_is_not_fatal() {
        let runner = PipelineRunner::new(vec![Arc::new(MarkTransferred)]);
        let run = runner
            .run_and_record(input(), &BrokenSink, &ExecutionContext::new())
            .unwrap();
        assert!(!run.recorded);
        assert_eq!(run.state.status, Some(TransferStatus::Transferred));
    }
}
