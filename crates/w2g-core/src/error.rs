//! Unified Error Model
use thiserror::Error;

use crate::stage::StageError;

#[derive(Error, Debug)]
pub enum W2gError {
    #[error("STAGE/{0}")]
    Stage(#[from] StageError),

    #[error("CONFIG/{0}")]
    Config(String),

    #[error("SINK/{0}")]
    Sink(String),

    #[error("SERIALIZE/{0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO/{0}")]
    Io(#[from] std::io::Error),
}
