//! End-to-end runs of the standard pipeline with scripted model seams.

use std::sync::{Arc, Mutex};

use w2g_core::{
    ExecutionContext, GiveState, PipelineInput, ResultSink, RewardStatus, TransferStatus,
    VaultAction, W2gConfig, W2gError,
};
use w2g_stages::{Collaborators, StageSet, TransferError, TransferGateway, STAGE_IDS};
use w2g_vision::testing::{photo_tool_reply, ScriptedModel, StaticDescriber};
use w2g_vision::DescribeError;

const PHOTO: &str = "./images/sharing.jpg";

fn reference_input() -> PipelineInput {
    PipelineInput {
        tokens: 20,
        vendor_id: "vendor_456".to_string(),
        viewer_id: "user_123".to_string(),
        verified_gives: 22,
        photo_path: Some(PHOTO.to_string()),
    }
}

fn stages_with(model: ScriptedModel, describer: StaticDescriber) -> StageSet {
    StageSet::from_config(
        &W2gConfig::default(),
        Collaborators::simulated(Arc::new(model), Arc::new(describer)),
    )
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

// =============================================================================
// Reference scenario
// =============================================================================

#[test]
fn test_reference_scenario() {
    let stages = stages_with(
        ScriptedModel::tool_then_text(PHOTO, "Score: 0.85 because a snack is handed over"),
        StaticDescriber::describing("A child receiving a snack from a vendor."),
    );
    let pipeline = stages.pipeline();

    let run = pipeline
        .run(reference_input(), &ExecutionContext::new())
        .unwrap();
    let state = run.state;

    assert_eq!(state.status, Some(TransferStatus::Transferred));
    assert_eq!(state.validation_result, Some(true));
    assert_eq!(state.score, Some(0.85));
    assert_eq!(state.vendor_apy, Some(12.5));
    assert_eq!(state.action, Some(VaultAction::Staked));
    assert_eq!(state.selected_vault.as_deref(), Some("vendor_456"));
    assert_eq!(state.reward_type.as_deref(), Some("robux"));
    assert_eq!(state.reward_gives, Some(20));
    assert_eq!(state.reward_status, Some(RewardStatus::Delivered));

    // inputs survive every merge
    assert_eq!(state.tokens, Some(20));
    assert_eq!(state.vendor_id.as_deref(), Some("vendor_456"));
    assert_eq!(state.viewer_id.as_deref(), Some("user_123"));
    assert_eq!(state.verified_gives, Some(22));
}

#[test]
fn test_stage_reports_follow_pipeline_order() {
    let stages = stages_with(
        ScriptedModel::tool_then_text(PHOTO, "Score: 0.9"),
        StaticDescriber::describing("A donation."),
    );
    let pipeline = stages.pipeline();
    assert_eq!(
        pipeline.pipeline_id(),
        "give_router→photo_validator→vault_decider→reward"
    );

    let run = pipeline
        .run(reference_input(), &ExecutionContext::new())
        .unwrap();
    let ids: Vec<&str> = run.stages.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, STAGE_IDS.to_vec());

    let validator = &run.stages[1];
    assert!(!validator.deterministic);
    assert_eq!(validator.path, vec!["infer", "act", "infer"]);

    for pair in run.stages.windows(2) {
        assert_eq!(pair[0].out_hash, pair[1].in_hash);
    }
}

// =============================================================================
// Absorbed failures
// =============================================================================

struct FailingTransfer;

impl TransferGateway for FailingTransfer {
    fn transfer(&self, _vendor_id: &str, _tokens: u64) -> Result<(), TransferError> {
        Err(TransferError("insufficient gas".to_string()))
    }
}

#[test]
fn test_failures_never_stop_the_run() {
    let mut collab = Collaborators::simulated(
        Arc::new(ScriptedModel::tool_then_text(PHOTO, "Score: 0.9")),
        Arc::new(StaticDescriber::failing(DescribeError::NotFound(PHOTO.to_string()))),
    );
    collab.transfer = Arc::new(FailingTransfer);
    let stages = StageSet::from_config(&W2gConfig::default(), collab);

    let run = stages
        .pipeline()
        .run(reference_input(), &ExecutionContext::new())
        .unwrap();
    let state = run.state;

    assert_eq!(state.status, Some(TransferStatus::TransferFailed));
    assert!(state.error_message.is_some());
    assert_eq!(state.validation_result, Some(false));
    assert_eq!(state.score, Some(0.0));
    assert_eq!(state.action, Some(VaultAction::Staked));
    assert_eq!(state.reward_status, Some(RewardStatus::Delivered));
}

#[test]
fn test_small_run_takes_no_actions() {
    let stages = stages_with(
        ScriptedModel::new([Ok(w2g_vision::ModelReply::text("Score: 0.3"))]),
        StaticDescriber::describing("unused"),
    );
    let input = PipelineInput {
        tokens: 2,
        vendor_id: "vendor_456".to_string(),
        viewer_id: "user_123".to_string(),
        verified_gives: 5,
        photo_path: Some(PHOTO.to_string()),
    };

    let run = stages.pipeline().run(input, &ExecutionContext::new()).unwrap();
    let state = run.state;

    assert_eq!(state.status, Some(TransferStatus::NotTransferred));
    assert_eq!(state.validation_result, Some(false));
    assert_eq!(state.action, None);
    assert_eq!(state.reward_type, None);
    assert_eq!(state.reward_status, None);
}

#[test]
fn test_largest_accepted_tool_cap_finishes_the_run() {
    let mut cfg = W2gConfig::default();
    cfg.validator.max_tool_rounds = 15;
    cfg.validate().unwrap();

    // a model that never stops asking for the tool
    let replies = (0..64).map(|i| Ok(photo_tool_reply(&format!("call_{}", i), PHOTO)));
    let describer = Arc::new(StaticDescriber::describing("A photo."));
    let stages = StageSet::from_config(
        &cfg,
        Collaborators::simulated(Arc::new(ScriptedModel::new(replies)), describer.clone()),
    );

    let run = stages
        .pipeline()
        .run(
            reference_input(),
            &ExecutionContext::with_max_steps(cfg.graph.max_steps),
        )
        .unwrap();

    assert_eq!(describer.calls(), 15);
    assert_eq!(run.stages[1].path.len(), 31);
    assert_eq!(run.state.validation_result, Some(false));
    assert_eq!(run.state.score, Some(0.0));
    assert_eq!(run.state.reward_type.as_deref(), Some("robux"));
}

// =============================================================================
// Result sink
// =============================================================================

#[test]
fn test_run_and_record_appends_final_record() {
    let stages = stages_with(
        ScriptedModel::tool_then_text(PHOTO, "Score: 0.8"),
        StaticDescriber::describing("A donation."),
    );
    let sink = MemorySink::default();

    let run = stages
        .pipeline()
        .run_and_record(reference_input(), &sink, &ExecutionContext::new())
        .unwrap();

    assert!(run.recorded);
    let records = sink.records.lock().unwrap();
    assert_eq!(records.as_slice(), &[run.state]);
}
