//! Search indexer: consumes `message-persisted` and upserts each message into
//! the search index.

pub mod config;
pub mod consumer;
pub mod error;
pub mod logging;

pub use consumer::IndexerConsumer;
pub use error::{ConsumerError, ConsumerResult};
