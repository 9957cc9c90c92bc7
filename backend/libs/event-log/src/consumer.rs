use crate::config::KafkaConfig;
use crate::error::LogResult;
use crate::record::{offset_bounds, InboundRecord};
use async_trait::async_trait;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A consumer-group subscription that hands out bounded batches and only
/// moves the group's committed position when told to.
#[async_trait]
pub trait BatchSource: Send {
    fn topic(&self) -> &str;

    /// Wait for up to `max_records`, returning early once `max_wait` elapses.
    /// An empty batch means nothing arrived in time.
    async fn next_batch(
        &mut self,
        max_records: usize,
        max_wait: Duration,
    ) -> LogResult<Vec<InboundRecord>>;

    /// Mark every record in `batch` as processed.
    async fn commit(&mut self, batch: &[InboundRecord]) -> LogResult<()>;

    /// Move the read position back to the start of `batch` so that it is
    /// delivered again.
    async fn rewind(&mut self, batch: &[InboundRecord]) -> LogResult<()>;

    /// Keep group membership alive while a batch is being processed.
    async fn heartbeat(&mut self) -> LogResult<()>;

    async fn close(&mut self) -> LogResult<()>;
}

/// Kafka consumer with manual commits
pub struct KafkaBatchSource {
    consumer: StreamConsumer,
    topic: String,
    group_id: String,
}

impl KafkaBatchSource {
    /// Join `group_id` and subscribe to `topic`.
    ///
    /// `from_beginning` only matters the first time a group is seen; after that
    /// the group's committed offsets win.
    pub fn connect(
        config: &KafkaConfig,
        group_id: &str,
        topic: &str,
        from_beginning: bool,
    ) -> LogResult<Self> {
        let consumer: StreamConsumer = config
            .client_config()
            .set("group.id", group_id)
            .set(
                "auto.offset.reset",
                if from_beginning { "earliest" } else { "latest" },
            )
            // Offsets are committed explicitly after each successful batch
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .set("heartbeat.interval.ms", config.heartbeat_interval_ms.to_string())
            .set("max.poll.interval.ms", config.max_poll_interval_ms.to_string())
            .create()?;

        consumer.subscribe(&[topic])?;

        info!(
            topic = %topic,
            group_id = %group_id,
            from_beginning,
            "Kafka consumer subscribed"
        );

        Ok(Self {
            consumer,
            topic: topic.to_string(),
            group_id: group_id.to_string(),
        })
    }
}

#[async_trait]
impl BatchSource for KafkaBatchSource {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn next_batch(
        &mut self,
        max_records: usize,
        max_wait: Duration,
    ) -> LogResult<Vec<InboundRecord>> {
        let deadline = Instant::now() + max_wait;
        let mut batch = Vec::with_capacity(max_records);

        while batch.len() < max_records {
            match tokio::time::timeout_at(deadline, self.consumer.recv()).await {
                Ok(Ok(message)) => batch.push(InboundRecord {
                    topic: message.topic().to_string(),
                    partition: message.partition(),
                    offset: message.offset(),
                    key: message.key().map(<[u8]>::to_vec),
                    payload: message.payload().map(<[u8]>::to_vec),
                }),
                Ok(Err(e)) if batch.is_empty() => return Err(e.into()),
                Ok(Err(e)) => {
                    // Hand back what was read so far rather than losing it
                    warn!(topic = %self.topic, error = %e, "Kafka receive error mid-batch");
                    break;
                }
                Err(_) => break,
            }
        }

        Ok(batch)
    }

    async fn commit(&mut self, batch: &[InboundRecord]) -> LogResult<()> {
        let mut offsets = TopicPartitionList::new();
        for (topic, partition, _, highest) in offset_bounds(batch) {
            offsets.add_partition_offset(&topic, partition, Offset::Offset(highest + 1))?;
        }
        if offsets.count() == 0 {
            return Ok(());
        }

        self.consumer.commit(&offsets, CommitMode::Async)?;
        debug!(topic = %self.topic, group_id = %self.group_id, records = batch.len(), "Offsets committed");
        Ok(())
    }

    async fn rewind(&mut self, batch: &[InboundRecord]) -> LogResult<()> {
        for (topic, partition, lowest, _) in offset_bounds(batch) {
            self.consumer
                .seek(&topic, partition, Offset::Offset(lowest), Duration::from_secs(5))?;
            debug!(topic = %topic, partition, offset = lowest, "Rewound partition for redelivery");
        }
        Ok(())
    }

    async fn heartbeat(&mut self) -> LogResult<()> {
        // librdkafka heartbeats from its own thread; losing the assignment
        // here means the group rebalanced away from us mid-batch.
        let assignment = self.consumer.assignment()?;
        if assignment.count() == 0 {
            warn!(topic = %self.topic, group_id = %self.group_id, "Consumer currently has no partitions assigned");
        }
        Ok(())
    }

    async fn close(&mut self) -> LogResult<()> {
        self.consumer.unsubscribe();
        info!(topic = %self.topic, group_id = %self.group_id, "Kafka consumer closed");
        Ok(())
    }
}

