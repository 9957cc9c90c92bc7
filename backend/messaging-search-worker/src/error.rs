use event_log::LogError;
use message_search::SearchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("search index error: {0}")]
    Search(#[from] SearchError),

    #[error("log error: {0}")]
    Log(#[from] LogError),
}

pub type ConsumerResult<T> = Result<T, ConsumerError>;
