//! Result Sink: where finished run records go.
use crate::error::W2gError;
use crate::state::GiveState;

/// Append-only store for final pipeline records.
///
/// Implementations shared between concurrent runs must serialize `append`.
pub trait ResultSink: Send + Sync {
    fn append(&self, record: &GiveState) -> Result<(), W2gError>;
}
