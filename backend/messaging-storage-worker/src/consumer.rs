//! Persists `create-message` batches and republishes them for indexing.

use crate::error::{ConsumerError, ConsumerResult};
use async_trait::async_trait;
use event_log::{metrics, BatchHandler, EventPublisher, InboundRecord, OutboundRecord};
use message_store::{Message, MessageRepository};
use std::sync::Arc;
use tracing::{info, warn};

pub struct StorageConsumer {
    repository: Arc<dyn MessageRepository>,
    publisher: Arc<dyn EventPublisher>,
    persisted_topic: String,
}

impl StorageConsumer {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        publisher: Arc<dyn EventPublisher>,
        persisted_topic: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            publisher,
            persisted_topic: persisted_topic.into(),
        }
    }

    pub async fn store_batch(&self, records: &[InboundRecord]) -> ConsumerResult<()> {
        let messages = decode_messages(records);
        if messages.is_empty() {
            return Ok(());
        }

        let inserted = self.repository.insert_many(&messages).await?;

        let outbound = messages
            .iter()
            .map(|m| {
                serde_json::to_vec(&m.persisted())
                    .map(|value| OutboundRecord::new(m.conversation_id.clone(), value))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.publisher.send(&self.persisted_topic, outbound).await?;

        info!(
            count = messages.len(),
            inserted,
            topic = %self.persisted_topic,
            "Stored message batch"
        );
        Ok(())
    }
}

/// Decode every record that holds a valid message; the rest are logged and
/// skipped.
fn decode_messages(records: &[InboundRecord]) -> Vec<Message> {
    records
        .iter()
        .filter_map(|record| {
            let decoded = record
                .payload
                .as_deref()
                .filter(|bytes| !bytes.is_empty())
                .map(|bytes| {
                    serde_json::from_slice::<Message>(bytes)
                        .map_err(|e| e.to_string())
                        .and_then(|message| match message.nul_field() {
                            // Would fail every insert of the batch it lands in
                            Some(field) => Err(format!("NUL character in {}", field)),
                            None => Ok(message),
                        })
                });

            match decoded {
                Some(Ok(message)) => Some(message),
                Some(Err(e)) => {
                    warn!(
                        topic = %record.topic,
                        partition = record.partition,
                        offset = record.offset,
                        error = %e,
                        "Dropping undecodable message"
                    );
                    metrics::record_dropped(&record.topic);
                    None
                }
                None => {
                    warn!(
                        topic = %record.topic,
                        partition = record.partition,
                        offset = record.offset,
                        "Dropping empty record"
                    );
                    metrics::record_dropped(&record.topic);
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl BatchHandler for StorageConsumer {
    type Error = ConsumerError;

    async fn handle_batch(&self, records: &[InboundRecord]) -> Result<(), Self::Error> {
        self.store_batch(records).await
    }
}
