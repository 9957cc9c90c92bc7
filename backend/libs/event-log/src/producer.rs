use crate::config::KafkaConfig;
use crate::error::{LogError, LogResult};
use crate::metrics;
use crate::record::OutboundRecord;
use async_trait::async_trait;
use futures::future::join_all;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Appends records to a topic.
///
/// `send` resolves only once every record in the call has been acknowledged,
/// so an `Ok` means the whole group is in the log.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn send(&self, topic: &str, records: Vec<OutboundRecord>) -> LogResult<()>;

    /// Flush anything still buffered and refuse further sends.
    async fn close(&self) -> LogResult<()>;
}

/// Kafka producer with idempotency guarantees
pub struct KafkaEventPublisher {
    producer: FutureProducer,
    delivery_timeout: Duration,
    closed: AtomicBool,
}

impl KafkaEventPublisher {
    /// Create the producer.
    ///
    /// - `enable.idempotence = true`: broker-side retries never duplicate a record
    /// - `acks = all`: a send succeeds only once every in-sync replica has it
    /// - `max.in.flight.requests.per.connection = 5`: keeps per-partition order with idempotence
    pub fn connect(config: &KafkaConfig) -> LogResult<Self> {
        let producer = config
            .client_config()
            .set("message.timeout.ms", "30000")
            .set("request.timeout.ms", "30000")
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("max.in.flight.requests.per.connection", "5")
            .set("retries", "5")
            .set("compression.type", "lz4")
            .set("linger.ms", "10")
            .create::<FutureProducer>()?;

        info!(
            brokers = %config.bootstrap_servers(),
            client_id = %config.client_id,
            "Kafka producer created with idempotency enabled"
        );

        Ok(Self {
            producer,
            delivery_timeout: Duration::from_secs(5),
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn send(&self, topic: &str, records: Vec<OutboundRecord>) -> LogResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LogError::Closed);
        }
        if records.is_empty() {
            return Ok(());
        }

        let deliveries = records.iter().map(|record| {
            let future_record = FutureRecord::to(topic)
                .key(record.key.as_str())
                .payload(record.value.as_slice());
            self.producer.send(future_record, self.delivery_timeout)
        });

        let mut first_error = None;
        let mut delivered = 0usize;
        for result in join_all(deliveries).await {
            match result {
                Ok((partition, offset)) => {
                    delivered += 1;
                    debug!(topic = %topic, partition, offset, "Record delivered");
                }
                Err((err, _message)) => {
                    warn!(topic = %topic, error = %err, "Record delivery failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        metrics::record_published(topic, delivered, true);

        match first_error {
            None => Ok(()),
            Some(source) => {
                metrics::record_published(topic, records.len() - delivered, false);
                Err(LogError::Publish {
                    topic: topic.to_string(),
                    source,
                })
            }
        }
    }

    async fn close(&self) -> LogResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(Duration::from_secs(10)))
            .await
            .map_err(|e| LogError::Unavailable(format!("producer flush task failed: {}", e)))??;

        info!("Kafka producer flushed and closed");
        Ok(())
    }
}
