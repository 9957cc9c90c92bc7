use elasticsearch::http::transport::BuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid Elasticsearch URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build transport: {0}")]
    TransportBuild(#[from] BuildError),
    #[error("transport error: {0}")]
    Transport(#[from] elasticsearch::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Elasticsearch returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{failed} bulk item(s) failed, first error: {reason}")]
    BulkItems { failed: usize, reason: String },
    #[error("search index unavailable: {0}")]
    Unavailable(String),
}

pub type SearchResult<T> = Result<T, SearchError>;
