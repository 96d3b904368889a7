//! Token transfer seam used by the give router.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("TRANSFER/{0}")]
pub struct TransferError(pub String);

/// Moves tokens to a vendor.
pub trait TransferGateway: Send + Sync {
    fn transfer(&self, vendor_id: &str, tokens: u64) -> Result<(), TransferError>;
}

/// Stand-in for the on-chain transfer; always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedTransfer;

impl TransferGateway for SimulatedTransfer {
    fn transfer(&self, vendor_id: &str, tokens: u64) -> Result<(), TransferError> {
        if vendor_id.trim().is_empty() {
            return Err(TransferError("vendor id is empty".to_string()));
        }
        tracing::debug!(vendor_id, tokens, "simulated transfer settled");
        Ok(())
    }
}
