//! Dashboard aggregates over stored run records.
use std::collections::BTreeMap;

use serde::Serialize;
use w2g_core::{GiveState, VaultAction};

/// Per-vendor totals. `latest_apy` is the APY seen in the newest record that
/// carried one. Token sums saturate at `u64::MAX`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VendorRow {
    pub vendor_id: String,
    pub latest_apy: Option<f64>,
    pub total_tokens: u64,
    pub staked_tokens: u64,
    pub runs: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub runs: usize,
    pub vendors: Vec<VendorRow>,
    pub rewards: BTreeMap<String, usize>,
    pub validated: usize,
    pub validation_pass_rate: f64,
}

impl RunSummary {
    /// Folds records in store order (oldest first).
    pub fn from_records(records: &[GiveState]) -> Self {
        let mut vendors: BTreeMap<String, VendorRow> = BTreeMap::new();
        let mut rewards: BTreeMap<String, usize> = BTreeMap::new();
        let mut checked = 0usize;
        let mut validated = 0usize;

        for record in records {
            if let Some(vendor_id) = &record.vendor_id {
                let row = vendors.entry(vendor_id.clone()).or_insert_with(|| VendorRow {
                    vendor_id: vendor_id.clone(),
                    ..VendorRow::default()
                });
                let tokens = record.tokens.unwrap_or(0);
                row.runs += 1;
                row.total_tokens = row.total_tokens.saturating_add(tokens);
                if record.action == Some(VaultAction::Staked) {
                    row.staked_tokens = row.staked_tokens.saturating_add(tokens);
                }
                if record.vendor_apy.is_some() {
                    row.latest_apy = record.vendor_apy;
                }
            }

            if let Some(reward) = &record.reward_type {
                *rewards.entry(reward.clone()).or_default() += 1;
            }

            if let Some(valid) = record.validation_result {
                checked += 1;
                if valid {
                    validated += 1;
                }
            }
        }

        let validation_pass_rate = if checked == 0 {
            0.0
        } else {
            validated as f64 / checked as f64
        };

        Self {
            runs: records.len(),
            vendors: vendors.into_values().collect(),
            rewards,
            validated,
            validation_pass_rate,
        }
    }
}
