//! Storage worker: consumes `create-message`, writes the record store, and
//! republishes each stored message on `message-persisted`.

pub mod config;
pub mod consumer;
pub mod error;
pub mod logging;

pub use consumer::StorageConsumer;
pub use error::{ConsumerError, ConsumerResult};
