use serde::{Deserialize, Serialize};
use w2g_core::config::VaultConfig;
use w2g_core::stage::require;
use w2g_core::{
    run_graph, ExecutionContext, GiveState, GraphNode, Stage, StageError, StageGraph, StageOutput,
    ThresholdTable, Transition, VaultAction,
};

use crate::registry::VaultRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInput {
    pub tokens: u64,
    pub vendor_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultState {
    pub tokens: u64,
    pub vendor_id: String,
    pub vendor_apy: f64,
    pub action: Option<VaultAction>,
    pub selected_vault: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultNode {
    CheckBalance,
    FetchApy,
    Stake,
    Redeem,
}

impl GraphNode for VaultNode {
    fn name(self) -> &'static str {
        match self {
            VaultNode::CheckBalance => "check_balance",
            VaultNode::FetchApy => "fetch_apy",
            VaultNode::Stake => "stake",
            VaultNode::Redeem => "redeem",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VaultMove {
    Stake,
    Redeem,
}

pub struct VaultDeciderStage {
    registry: VaultRegistry,
    moves: ThresholdTable<VaultMove>,
    apy_threshold: f64,
}

impl VaultDeciderStage {
    pub fn new(
        registry: VaultRegistry,
        stake_threshold: u64,
        redeem_threshold: u64,
        apy_threshold: f64,
    ) -> Self {
        // stake first so it wins a tie with redeem
        let moves = ThresholdTable::new([
            (stake_threshold, VaultMove::Stake),
            (redeem_threshold, VaultMove::Redeem),
        ]);
        Self {
            registry,
            moves,
            apy_threshold,
        }
    }

    pub fn from_config(cfg: &VaultConfig) -> Self {
        Self::new(
            VaultRegistry::from_config(cfg),
            cfg.stake_threshold,
            cfg.redeem_threshold,
            cfg.apy_threshold,
        )
    }

    pub fn decide(
        &self,
        input: VaultInput,
        ctx: &ExecutionContext,
    ) -> Result<(VaultState, Vec<&'static str>), StageError> {
        let state = VaultState {
            tokens: input.tokens,
            vendor_id: input.vendor_id,
            vendor_apy: 0.0,
            action: None,
            selected_vault: None,
        };
        let run = run_graph(self, state, ctx)?;
        Ok((run.state, run.path))
    }

    fn route_decision(&self, state: &VaultState) -> Transition<VaultNode> {
        // a registry miss reads as 0.0; only that ends the graph here
        if state.vendor_apy == 0.0 {
            tracing::warn!(vendor_id = %state.vendor_id, "vendor not found in vault registry");
            return Transition::Terminal;
        }

        let choice = self
            .moves
            .matches_descending(state.tokens)
            .map(|(_, m)| *m)
            .find(|m| match m {
                VaultMove::Stake => state.vendor_apy >= self.apy_threshold,
                VaultMove::Redeem => true,
            });

        match choice {
            Some(VaultMove::Stake) => Transition::Branch(VaultNode::Stake),
            Some(VaultMove::Redeem) => Transition::Branch(VaultNode::Redeem),
            None => {
                tracing::info!(tokens = state.tokens, "balance too low, no vault action");
                Transition::Terminal
            }
        }
    }
}

impl StageGraph for VaultDeciderStage {
    type State = VaultState;
    type Node = VaultNode;

    fn name(&self) -> &'static str {
        "vault_decider"
    }

    fn entry(&self) -> VaultNode {
        VaultNode::CheckBalance
    }

    fn step(&self, node: VaultNode, mut state: VaultState) -> (VaultState, Transition<VaultNode>) {
        match node {
            VaultNode::CheckBalance => {
                tracing::info!(tokens = state.tokens, "checking token balance");
                (state, Transition::Continue(VaultNode::FetchApy))
            }
            VaultNode::FetchApy => {
                state.vendor_apy = self.registry.apy(&state.vendor_id).unwrap_or(0.0);
                tracing::info!(apy = state.vendor_apy, "vendor apy fetched");
                let transition = self.route_decision(&state);
                (state, transition)
            }
            VaultNode::Stake => {
                tracing::info!(tokens = state.tokens, vendor_id = %state.vendor_id, "staking tokens");
                state.action = Some(VaultAction::Staked);
                state.selected_vault = Some(state.vendor_id.clone());
                (state, Transition::Terminal)
            }
            VaultNode::Redeem => {
                tracing::info!(tokens = state.tokens, vendor_id = %state.vendor_id, "redeeming tokens");
                state.action = Some(VaultAction::Redeemed);
                (state, Transition::Terminal)
            }
        }
    }
}

impl Stage for VaultDeciderStage {
    fn id(&self) -> &'static str {
        "vault_decider"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["tokens", "vendor_id"]
    }

    fn run(&self, state: &GiveState, ctx: &ExecutionContext) -> Result<StageOutput, StageError> {
        let input = VaultInput {
            tokens: require(&state.tokens, "tokens")?,
            vendor_id: require(&state.vendor_id, "vendor_id")?,
        };
        let (out, path) = self.decide(input, ctx)?;
        Ok(StageOutput {
            patch: GiveState {
                vendor_apy: Some(out.vendor_apy),
                action: out.action,
                selected_vault: out.selected_vault,
                ..GiveState::default()
            },
            path,
        })
    }
}
