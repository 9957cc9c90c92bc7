use rdkafka::error::KafkaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("Failed to publish to {topic}: {source}")]
    Publish {
        topic: String,
        #[source]
        source: KafkaError,
    },

    #[error("Log client is closed")]
    Closed,

    #[error("Log unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid log configuration: {0}")]
    Config(String),
}

impl LogError {
    /// Errors that are expected to clear up on their own (broker restarts,
    /// leader elections, full local queues)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LogError::Kafka(_) | LogError::Publish { .. } | LogError::Unavailable(_)
        )
    }
}

pub type LogResult<T> = Result<T, LogError>;
