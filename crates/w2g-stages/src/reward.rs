use std::sync::Arc;

use serde::{Deserialize, Serialize};
use w2g_core::config::RewardConfig;
use w2g_core::stage::require;
use w2g_core::{
    run_graph, ExecutionContext, GiveState, GraphNode, RewardStatus, Stage, StageError, StageGraph,
    StageOutput, ThresholdTable, Transition,
};

use crate::dispatch::RewardDispatcher;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardInput {
    pub viewer_id: String,
    pub verified_gives: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardState {
    pub viewer_id: String,
    pub verified_gives: u64,
    pub reward_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_gives: Option<u64>,
    pub reward_status: Option<RewardStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardNode {
    CheckReward,
    AssignReward,
    Dispatch,
}

impl GraphNode for RewardNode {
    fn name(self) -> &'static str {
        match self {
            RewardNode::CheckReward => "check_reward",
            RewardNode::AssignReward => "assign_reward",
            RewardNode::Dispatch => "dispatch",
        }
    }
}

/// Grants viewers the highest reward tier their verified gives qualify for.
pub struct RewardStage {
    tiers: ThresholdTable<String>,
    dispatcher: Arc<dyn RewardDispatcher>,
}

impl RewardStage {
    pub fn new(tiers: ThresholdTable<String>, dispatcher: Arc<dyn RewardDispatcher>) -> Self {
        Self { tiers, dispatcher }
    }

    pub fn from_config(cfg: &RewardConfig, dispatcher: Arc<dyn RewardDispatcher>) -> Self {
        let tiers = cfg
            .tiers
            .iter()
            .map(|t| (t.min_gives, t.reward.clone()))
            .collect();
        Self::new(tiers, dispatcher)
    }

    pub fn reward(
        &self,
        input: RewardInput,
        ctx: &ExecutionContext,
    ) -> Result<(RewardState, Vec<&'static str>), StageError> {
        let state = RewardState {
            viewer_id: input.viewer_id,
            verified_gives: input.verified_gives,
            reward_type: None,
            reward_gives: None,
            reward_status: None,
            reward_error: None,
        };
        let run = run_graph(self, state, ctx)?;
        Ok((run.state, run.path))
    }

    fn assign_reward(&self, mut state: RewardState) -> RewardState {
        match self.tiers.highest_match(state.verified_gives) {
            Some((threshold, reward)) => {
                tracing::info!(reward = %reward, threshold, "assigning reward");
                state.reward_type = Some(reward.clone());
                state.reward_gives = Some(threshold);
            }
            None => {
                tracing::warn!(gives = state.verified_gives, "no reward eligible");
                state.reward_type = None;
            }
        }
        state
    }

    fn dispatch(&self, mut state: RewardState) -> RewardState {
        let Some(reward) = state.reward_type.clone() else {
            return state;
        };
        tracing::info!(reward = %reward, viewer_id = %state.viewer_id, "dispatching reward");
        match self.dispatcher.dispatch(&state.viewer_id, &reward) {
            Ok(()) => state.reward_status = Some(RewardStatus::Delivered),
            Err(e) => {
                tracing::error!(error = %e, "reward dispatch failed");
                state.reward_status = Some(RewardStatus::DispatchFailed);
                state.reward_error = Some(e.to_string());
            }
        }
        state
    }
}

impl StageGraph for RewardStage {
    type State = RewardState;
    type Node = RewardNode;

    fn name(&self) -> &'static str {
        "reward"
    }

    fn entry(&self) -> RewardNode {
        RewardNode::CheckReward
    }

    fn step(&self, node: RewardNode, state: RewardState) -> (RewardState, Transition<RewardNode>) {
        match node {
            RewardNode::CheckReward => {
                tracing::info!(
                    viewer_id = %state.viewer_id,
                    gives = state.verified_gives,
                    "checking eligibility"
                );
                (state, Transition::Continue(RewardNode::AssignReward))
            }
            RewardNode::AssignReward => {
                let state = self.assign_reward(state);
                let transition = if state.reward_type.is_some() {
                    Transition::Branch(RewardNode::Dispatch)
                } else {
                    Transition::Terminal
                };
                (state, transition)
            }
            RewardNode::Dispatch => (self.dispatch(state), Transition::Terminal),
        }
    }
}

impl Stage for RewardStage {
    fn id(&self) -> &'static str {
        "reward"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["viewer_id", "verified_gives"]
    }

    fn run(&self, state: &GiveState, ctx: &ExecutionContext) -> Result<StageOutput, StageError> {
        let input = RewardInput {
            viewer_id: require(&state.viewer_id, "viewer_id")?,
            verified_gives: require(&state.verified_gives, "verified_gives")?,
        };
        let (out, path) = self.reward(input, ctx)?;
        Ok(StageOutput {
            patch: GiveState {
                reward_type: out.reward_type,
                reward_gives: out.reward_gives,
                reward_status: out.reward_status,
                reward_error: out.reward_error,
                ..GiveState::default()
            },
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchError, LoggingDispatcher};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingDispatcher {
        calls: AtomicUsize,
    }

    impl RewardDispatcher for CountingDispatcher {
        fn dispatch(&self, _viewer_id: &str, _reward: &str) -> Result<(), DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RejectingDispatcher;

    impl RewardDispatcher for RejectingDispatcher {
        fn dispatch(&self, _viewer_id: &str, _reward: &str) -> Result<(), DispatchError> {
            Err(DispatchError("wallet offline".to_string()))
        }
    }

    fn input(gives: u64) -> RewardInput {
        RewardInput {
            viewer_id: "user_123".to_string(),
            verified_gives: gives,
        }
    }

    #[test]
    fn assigns_highest_qualifying_tier() {
        let stage = RewardStage::from_config(&RewardConfig::default(), Arc::new(LoggingDispatcher));
        let ctx = ExecutionContext::new();

        for (gives, reward, tier) in [
            (60, "mystery-nft", 50),
            (20, "robux", 20),
            (22, "robux", 20),
            (10, "v-bucks", 10),
        ] {
            let (state, path) = stage.reward(input(gives), &ctx).unwrap();
            assert_eq!(state.reward_type.as_deref(), Some(reward), "gives={}", gives);
            assert_eq!(state.reward_gives, Some(tier));
            assert_eq!(state.reward_status, Some(RewardStatus::Delivered));
            assert_eq!(path, vec!["check_reward", "assign_reward", "dispatch"]);
        }
    }

    #[test]
    fn below_lowest_tier_does_not_dispatch() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let stage = RewardStage::from_config(&RewardConfig::default(), dispatcher.clone());

        let (state, path) = stage.reward(input(5), &ExecutionContext::new()).unwrap();
        assert_eq!(state.reward_type, None);
        assert_eq!(state.reward_status, None);
        assert_eq!(path, vec!["check_reward", "assign_reward"]);
        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dispatch_failure_is_a_distinct_status() {
        let stage = RewardStage::from_config(&RewardConfig::default(), Arc::new(RejectingDispatcher));
        let (state, _) = stage.reward(input(60), &ExecutionContext::new()).unwrap();
        assert_eq!(state.reward_type.as_deref(), Some("mystery-nft"));
        assert_eq!(state.reward_status, Some(RewardStatus::DispatchFailed));
        assert!(state.reward_error.unwrap().contains("wallet offline"));
    }

    #[test]
    fn stage_requires_viewer() {
        let stage = RewardStage::from_config(&RewardConfig::default(), Arc::new(LoggingDispatcher));
        let state = GiveState {
            verified_gives: Some(22),
            ..GiveState::default()
        };
        let err = stage.run(&state, &ExecutionContext::new()).unwrap_err();
        assert_eq!(err, StageError::MissingInput("viewer_id"));
    }
}
