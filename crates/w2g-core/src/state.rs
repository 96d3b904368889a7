//! Shared State Record threaded through a pipeline run.
//!
//! Every field is optional so a stage's output can be expressed as a patch of
//! only the fields it produced. [`GiveState::merge`] folds a patch into the
//! accumulated record without ever dropping a field.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Transferred,
    TransferFailed,
    NotTransferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultAction {
    Staked,
    Redeemed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Delivered,
    DispatchFailed,
}

/// The record accumulated across all four stages of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GiveState {
    // --- input ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_gives: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,

    // --- routing ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TransferStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    // --- validation ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    // --- vault ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_apy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<VaultAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_vault: Option<String>,

    // --- reward ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_gives: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_status: Option<RewardStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_error: Option<String>,
}

impl GiveState {
    /// Shallow overwrite union: fields present in `patch` win, every other
    /// field keeps its prior value.
    pub fn merge(self, patch: GiveState) -> GiveState {
        GiveState {
            tokens: patch.tokens.or(self.tokens),
            vendor_id: patch.vendor_id.or(self.vendor_id),
            viewer_id: patch.viewer_id.or(self.viewer_id),
            verified_gives: patch.verified_gives.or(self.verified_gives),
            photo_path: patch.photo_path.or(self.photo_path),
            status: patch.status.or(self.status),
            error_message: patch.error_message.or(self.error_message),
            validation_result: patch.validation_result.or(self.validation_result),
            score: patch.score.or(self.score),
            vendor_apy: patch.vendor_apy.or(self.vendor_apy),
            action: patch.action.or(self.action),
            selected_vault: patch.selected_vault.or(self.selected_vault),
            reward_type: patch.reward_type.or(self.reward_type),
            reward_gives: patch.reward_gives.or(self.reward_gives),
            reward_status: patch.reward_status.or(self.reward_status),
            reward_error: patch.reward_error.or(self.reward_error),
        }
    }

    /// Copy holding only the named fields; everything else is `None`.
    /// Unknown names select nothing.
    pub fn select(&self, fields: &[&str]) -> GiveState {
        let mut view = GiveState::default();
        for field in fields {
            match *field {
                "tokens" => view.tokens = self.tokens,
                "vendor_id" => view.vendor_id = self.vendor_id.clone(),
                "viewer_id" => view.viewer_id = self.viewer_id.clone(),
                "verified_gives" => view.verified_gives = self.verified_gives,
                "photo_path" => view.photo_path = self.photo_path.clone(),
                "status" => view.status = self.status,
                "error_message" => view.error_message = self.error_message.clone(),
                "validation_result" => view.validation_result = self.validation_result,
                "score" => view.score = self.score,
                "vendor_apy" => view.vendor_apy = self.vendor_apy,
                "action" => view.action = self.action,
                "selected_vault" => view.selected_vault = self.selected_vault.clone(),
                "reward_type" => view.reward_type = self.reward_type.clone(),
                "reward_gives" => view.reward_gives = self.reward_gives,
                "reward_status" => view.reward_status = self.reward_status,
                "reward_error" => view.reward_error = self.reward_error.clone(),
                other => tracing::warn!(field = other, "unknown input field"),
            }
        }
        view
    }
}

/// Union of every stage's declared inputs, as accepted by a full run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInput {
    pub tokens: u64,
    pub vendor_id: String,
    pub viewer_id: String,
    pub verified_gives: u64,
    #[serde(default)]
    pub photo_path: Option<String>,
}

impl From<PipelineInput> for GiveState {
    fn from(input: PipelineInput) -> Self {
        GiveState {
            tokens: Some(input.tokens),
            vendor_id: Some(input.vendor_id),
            viewer_id: Some(input.viewer_id),
            verified_gives: Some(input.verified_gives),
            photo_path: input.photo_path,
            ..GiveState::default()
        }
    }
}
