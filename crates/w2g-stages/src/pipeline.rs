//! Convenience builders wiring the four stages into the standard pipeline.
use std::sync::Arc;

use w2g_core::{PipelineRunner, Stage, W2gConfig};
use w2g_vision::{ChatModel, PhotoDescriber};

use crate::dispatch::{LoggingDispatcher, RewardDispatcher};
use crate::give_router::GiveRouterStage;
use crate::photo_validator::PhotoValidatorStage;
use crate::reward::RewardStage;
use crate::transfer::{SimulatedTransfer, TransferGateway};
use crate::vault_decider::VaultDeciderStage;

/// External collaborators the stages call out to.
#[derive(Clone)]
pub struct Collaborators {
    pub transfer: Arc<dyn TransferGateway>,
    pub model: Arc<dyn ChatModel>,
    pub describer: Arc<dyn PhotoDescriber>,
    pub dispatcher: Arc<dyn RewardDispatcher>,
}

impl Collaborators {
    /// Simulated transfer and dispatch around the given model seams.
    pub fn simulated(model: Arc<dyn ChatModel>, describer: Arc<dyn PhotoDescriber>) -> Self {
        Self {
            transfer: Arc::new(SimulatedTransfer),
            model,
            describer,
            dispatcher: Arc::new(LoggingDispatcher),
        }
    }
}

/// The four configured stages, shared by the per-stage endpoints and the
/// full pipeline.
#[derive(Clone)]
pub struct StageSet {
    pub router: Arc<GiveRouterStage>,
    pub validator: Arc<PhotoValidatorStage>,
    pub vault: Arc<VaultDeciderStage>,
    pub reward: Arc<RewardStage>,
}

impl StageSet {
    pub fn from_config(cfg: &W2gConfig, collab: Collaborators) -> Self {
        Self {
            router: Arc::new(GiveRouterStage::new(cfg.router.threshold, collab.transfer)),
            validator: Arc::new(PhotoValidatorStage::new(
                collab.model,
                collab.describer,
                cfg.validator.threshold,
                cfg.validator.max_tool_rounds,
            )),
            vault: Arc::new(VaultDeciderStage::from_config(&cfg.vault)),
            reward: Arc::new(RewardStage::from_config(&cfg.reward, collab.dispatcher)),
        }
    }

    /// Routing → Validation → Vault → Reward.
    pub fn pipeline(&self) -> PipelineRunner {
        let stages = vec![
            self.router.clone() as Arc<dyn Stage>,
            self.validator.clone() as Arc<dyn Stage>,
            self.vault.clone() as Arc<dyn Stage>,
            self.reward.clone() as Arc<dyn Stage>,
        ];
        PipelineRunner::new(stages)
    }
}
