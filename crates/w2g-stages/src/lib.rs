//! Watch2Give Stages: the four decision stages of a giving run.
//!
//! # Pipeline Flow
//!
//! ```text
//! Input → GiveRouter → PhotoValidator → VaultDecider → Reward → Result Sink
//!             ↓              ↓               ↓            ↓
//!          status     validation/score   action/apy   reward_type
//! ```
//!
//! Each stage is a small [`w2g_core::StageGraph`]; failures of the external
//! calls they make are absorbed into status fields and never abort a run.

pub mod dispatch;
pub mod give_router;
pub mod photo_validator;
pub mod pipeline;
pub mod registry;
pub mod reward;
pub mod transfer;
pub mod vault_decider;

pub use dispatch::{DispatchError, LoggingDispatcher, RewardDispatcher};
pub use give_router::{GiveRouterStage, RouterInput, RouterState};
pub use photo_validator::{extract_score, PhotoValidatorStage, ValidationOutcome, ValidatorInput};
pub use pipeline::{Collaborators, StageSet};
pub use registry::VaultRegistry;
pub use reward::{RewardInput, RewardStage, RewardState};
pub use transfer::{SimulatedTransfer, TransferError, TransferGateway};
pub use vault_decider::{VaultDeciderStage, VaultInput, VaultState};

/// Stage ids in pipeline order; also the agent names the dashboard matches.
pub const STAGE_IDS: [&str; 4] = ["give_router", "photo_validator", "vault_decider", "reward"];
