//! Indexes `message-persisted` batches for full-text search.

use crate::config::RETRY_ON_CONFLICT;
use crate::error::{ConsumerError, ConsumerResult};
use async_trait::async_trait;
use event_log::{metrics, BatchHandler, InboundRecord};
use message_search::{MessageDocument, MessageSearchIndex};
use std::sync::Arc;
use tracing::{info, warn};

pub struct IndexerConsumer {
    index: Arc<dyn MessageSearchIndex>,
    index_name: String,
}

impl IndexerConsumer {
    pub fn new(index: Arc<dyn MessageSearchIndex>, index_name: impl Into<String>) -> Self {
        Self {
            index,
            index_name: index_name.into(),
        }
    }

    pub async fn index_batch(&self, records: &[InboundRecord]) -> ConsumerResult<()> {
        let documents: Vec<MessageDocument> = records.iter().filter_map(decode_document).collect();
        if documents.is_empty() {
            return Ok(());
        }

        self.index
            .bulk_upsert(&self.index_name, &documents, RETRY_ON_CONFLICT)
            .await?;

        info!(count = documents.len(), index = %self.index_name, "Indexed message batch");
        Ok(())
    }
}

fn decode_document(record: &InboundRecord) -> Option<MessageDocument> {
    let result = match record.payload.as_deref() {
        Some(bytes) if !bytes.is_empty() => serde_json::from_slice::<MessageDocument>(bytes)
            .map_err(|e| e.to_string())
            .and_then(|doc| match doc.timestamp {
                // Pages resume from the timestamp, so a document without one
                // could not be paged past
                Some(_) => Ok(doc),
                None => Err("missing timestamp".to_string()),
            }),
        _ => Err("empty payload".to_string()),
    };

    match result {
        Ok(document) => Some(document),
        Err(reason) => {
            warn!(
                topic = %record.topic,
                partition = record.partition,
                offset = record.offset,
                reason = %reason,
                "Dropping undecodable persisted message"
            );
            metrics::record_dropped(&record.topic);
            None
        }
    }
}

#[async_trait]
impl BatchHandler for IndexerConsumer {
    type Error = ConsumerError;

    async fn handle_batch(&self, records: &[InboundRecord]) -> Result<(), Self::Error> {
        self.index_batch(records).await
    }
}
