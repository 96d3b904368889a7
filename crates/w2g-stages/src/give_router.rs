use std::sync::Arc;

use serde::{Deserialize, Serialize};
use w2g_core::stage::require;
use w2g_core::{
    run_graph, ExecutionContext, GiveState, GraphNode, Stage, StageError, StageGraph, StageOutput,
    TransferStatus, Transition,
};

use crate::transfer::TransferGateway;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterInput {
    pub tokens: u64,
    pub vendor_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterState {
    pub tokens: u64,
    pub vendor_id: String,
    pub status: Option<TransferStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterNode {
    PassState,
    TriggerTransfer,
}

impl GraphNode for RouterNode {
    fn name(self) -> &'static str {
        match self {
            RouterNode::PassState => "pass_state",
            RouterNode::TriggerTransfer => "trigger_transfer",
        }
    }
}

/// Routes tokens to a vendor once the token count reaches the threshold.
pub struct GiveRouterStage {
    threshold: u64,
    gateway: Arc<dyn TransferGateway>,
}

impl GiveRouterStage {
    pub fn new(threshold: u64, gateway: Arc<dyn TransferGateway>) -> Self {
        Self { threshold, gateway }
    }

    /// Runs the routing graph, defaulting the status to `not_transferred`
    /// when no transfer was triggered.
    pub fn route(
        &self,
        input: RouterInput,
        ctx: &ExecutionContext,
    ) -> Result<(RouterState, Vec<&'static str>), StageError> {
        let state = RouterState {
            tokens: input.tokens,
            vendor_id: input.vendor_id,
            status: None,
            error_message: None,
        };

        let run = run_graph(self, state, ctx)?;
        let mut state = run.state;
        if state.status.is_none() {
            let _enter = ctx.span().enter();
            tracing::info!("no transfer triggered, marking as not_transferred");
            state.status = Some(TransferStatus::NotTransferred);
        }
        Ok((state, run.path))
    }

    fn trigger_transfer(&self, mut state: RouterState) -> RouterState {
        tracing::info!(
            tokens = state.tokens,
            vendor_id = %state.vendor_id,
            "initiating token transfer"
        );
        match self.gateway.transfer(&state.vendor_id, state.tokens) {
            Ok(()) => {
                tracing::info!("transfer successful");
                state.status = Some(TransferStatus::Transferred);
            }
            Err(e) => {
                tracing::error!(vendor_id = %state.vendor_id, error = %e, "transfer failed");
                state.status = Some(TransferStatus::TransferFailed);
                state.error_message = Some(e.to_string());
            }
        }
        state
    }
}

impl StageGraph for GiveRouterStage {
    type State = RouterState;
    type Node = RouterNode;

    fn name(&self) -> &'static str {
        "give_router"
    }

    fn entry(&self) -> RouterNode {
        RouterNode::PassState
    }

    fn step(&self, node: RouterNode, state: RouterState) -> (RouterState, Transition<RouterNode>) {
        match node {
            RouterNode::PassState => {
                tracing::info!(tokens = state.tokens, threshold = self.threshold, "deciding next action");
                if state.tokens >= self.threshold {
                    tracing::info!("threshold met, routing to trigger_transfer");
                    (state, Transition::Branch(RouterNode::TriggerTransfer))
                } else {
                    tracing::info!("threshold not met, ending flow");
                    (state, Transition::Terminal)
                }
            }
            RouterNode::TriggerTransfer => (self.trigger_transfer(state), Transition::Terminal),
        }
    }
}

impl Stage for GiveRouterStage {
    fn id(&self) -> &'static str {
        "give_router"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["tokens", "vendor_id"]
    }

    fn run(&self, state: &GiveState, ctx: &ExecutionContext) -> Result<StageOutput, StageError> {
        let input = RouterInput {
            tokens: require(&state.tokens, "tokens")?,
            vendor_id: require(&state.vendor_id, "vendor_id")?,
        };
        let (out, path) = self.route(input, ctx)?;
        Ok(StageOutput {
            patch: GiveState {
                status: out.status,
                error_message: out.error_message,
                ..GiveState::default()
            },
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{SimulatedTransfer, TransferError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransfer {
        calls: AtomicUsize,
    }

    impl TransferGateway for CountingTransfer {
        fn transfer(&self, _vendor_id: &str, _tokens: u64) -> Result<(), TransferError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingTransfer;

    impl TransferGateway for FailingTransfer {
        fn transfer(&self, _vendor_id: &str, _tokens: u64) -> Result<(), TransferError> {
            Err(TransferError("chain unavailable".to_string()))
        }
    }

    fn input(tokens: u64) -> RouterInput {
        RouterInput {
            tokens,
            vendor_id: "vendor_456".to_string(),
        }
    }

    #[test]
    fn below_threshold_never_transfers() {
        let gateway = Arc::new(CountingTransfer::default());
        let stage = GiveRouterStage::new(5, gateway.clone());
        let ctx = ExecutionContext::new();

        for tokens in 0..5 {
            let (state, path) = stage.route(input(tokens), &ctx).unwrap();
            assert_eq!(state.status, Some(TransferStatus::NotTransferred));
            assert_eq!(path, vec!["pass_state"]);
        }
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn at_or_above_threshold_transfers() {
        let stage = GiveRouterStage::new(5, Arc::new(SimulatedTransfer));
        let ctx = ExecutionContext::new();

        for tokens in [5, 6, 30] {
            let (state, path) = stage.route(input(tokens), &ctx).unwrap();
            assert_eq!(state.status, Some(TransferStatus::Transferred));
            assert_eq!(state.error_message, None);
            assert_eq!(path, vec!["pass_state", "trigger_transfer"]);
        }
    }

    #[test]
    fn failed_transfer_is_absorbed() {
        let stage = GiveRouterStage::new(5, Arc::new(FailingTransfer));
        let (state, _) = stage.route(input(20), &ExecutionContext::new()).unwrap();
        assert_eq!(state.status, Some(TransferStatus::TransferFailed));
        let message = state.error_message.unwrap();
        assert!(message.contains("chain unavailable"));
    }

    #[test]
    fn stage_requires_tokens() {
        let stage = GiveRouterStage::new(5, Arc::new(SimulatedTransfer));
        let state = GiveState {
            vendor_id: Some("vendor_456".to_string()),
            ..GiveState::default()
        };
        let err = stage.run(&state, &ExecutionContext::new()).unwrap_err();
        assert_eq!(err, StageError::MissingInput("tokens"));
    }

    #[test]
    fn stage_patch_only_carries_routing_fields() {
        let stage = GiveRouterStage::new(5, Arc::new(SimulatedTransfer));
        let state = GiveState {
            tokens: Some(20),
            vendor_id: Some("vendor_456".to_string()),
            ..GiveState::default()
        };
        let out = stage.run(&state, &ExecutionContext::new()).unwrap();
        assert_eq!(out.patch.status, Some(TransferStatus::Transferred));
        assert_eq!(out.patch.tokens, None);
    }
}
