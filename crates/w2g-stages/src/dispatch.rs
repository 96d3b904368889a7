//! Reward delivery seam.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("DISPATCH/{0}")]
pub struct DispatchError(pub String);

pub trait RewardDispatcher: Send + Sync {
    fn dispatch(&self, viewer_id: &str, reward: &str) -> Result<(), DispatchError>;
}

/// Records the delivery in the log only; no external call is made.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

impl RewardDispatcher for LoggingDispatcher {
    fn dispatch(&self, viewer_id: &str, reward: &str) -> Result<(), DispatchError> {
        tracing::info!(viewer_id, reward, "reward delivered");
        Ok(())
    }
}
