use thiserror::Error;
use w2g_core::W2gError;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO/{0}")]
    Io(#[from] std::io::Error),

    #[error("SERIALIZE/{0}")]
    Serialize(#[from] serde_json::Error),

    #[error("LOCK/result store lock poisoned")]
    Poisoned,
}

impl From<SinkError> for W2gError {
    fn from(err: SinkError) -> Self {
        W2gError::Sink(err.to_string())
    }
}
