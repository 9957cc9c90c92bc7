use event_log::LogError;
use message_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("log error: {0}")]
    Log(#[from] LogError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ConsumerResult<T> = Result<T, ConsumerError>;
