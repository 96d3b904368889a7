//! Chat model seam.
use thiserror::Error;

use crate::message::{ChatMessage, ModelReply, ToolSpec};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("MODEL/CONFIG: missing api key in {0}")]
    MissingApiKey(String),

    #[error("MODEL/TIMEOUT: {0}")]
    Timeout(String),

    #[error("MODEL/TRANSPORT: {0}")]
    Transport(String),

    #[error("MODEL/STATUS: {status}: {body}")]
    Status { status: u16, body: String },

    #[error("MODEL/DECODE: {0}")]
    Decode(String),
}

/// A blocking, tool-capable chat completion model.
pub trait ChatModel: Send + Sync {
    fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ModelReply, ModelError>;
}
