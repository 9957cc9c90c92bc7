//! Log client for the messaging pipeline
//!
//! Wraps Kafka behind two small traits so the services can be exercised
//! against an in-memory log:
//!
//! - [`EventPublisher`]: append keyed records to a topic
//! - [`BatchSource`]: a consumer-group subscription with manual commit/rewind
//!
//! [`run_batch_loop`] ties a source to a [`BatchHandler`] with
//! commit-on-success semantics. A failed batch is rewound and delivered again,
//! so handlers must be idempotent.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use event_log::{run_batch_loop, BatchLoopOptions, KafkaBatchSource, KafkaConfig};
//!
//! let config = KafkaConfig::new("localhost:9092", "messaging-storage-worker")?;
//! let source = KafkaBatchSource::connect(&config, "storage", "create-message", false)?;
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! run_batch_loop(source, handler, BatchLoopOptions::default(), shutdown_rx).await?;
//! ```

pub mod batch;
pub mod config;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod producer;
pub mod record;

pub use batch::{run_batch_loop, BatchHandler, BatchLoopOptions, BatchLoopStats};
pub use config::KafkaConfig;
pub use consumer::{BatchSource, KafkaBatchSource};
pub use error::{LogError, LogResult};
pub use memory::{MemoryBatchSource, MemoryLog};
pub use producer::{EventPublisher, KafkaEventPublisher};
pub use record::{InboundRecord, OutboundRecord};
