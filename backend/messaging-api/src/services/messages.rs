use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::CreateMessageRequest;
use chrono::{SubsecRound, Utc};
use event_log::{EventPublisher, OutboundRecord};
use message_store::Message;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// Ingestion producer: stamps a server timestamp and appends the message to
/// the create topic. Nothing is written anywhere else.
pub struct MessageService {
    publisher: Arc<dyn EventPublisher>,
    topic: String,
}

impl MessageService {
    pub fn new(publisher: Arc<dyn EventPublisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }

    /// Enqueue a message. `Ok` means the log accepted it, not that it has been
    /// stored yet.
    pub async fn create_message(&self, request: CreateMessageRequest) -> AppResult<Message> {
        // Stored and indexed timestamps keep millisecond precision
        let message = Message {
            id: request.id,
            conversation_id: request.conversation_id,
            sender_id: request.sender_id,
            content: request.content,
            metadata: request.metadata.map(Value::Object),
            timestamp: Utc::now().trunc_subsecs(3),
        };

        let value = serde_json::to_vec(&message).map_err(|e| {
            error!(message_id = %message.id, error = %e, "Failed to encode message");
            AppError::Internal
        })?;

        let record = OutboundRecord::new(message.conversation_id.clone(), value);
        let result = self.publisher.send(&self.topic, vec![record]).await;
        metrics::record_enqueue(result.is_ok());
        result?;

        debug!(
            message_id = %message.id,
            conversation_id = %message.conversation_id,
            topic = %self.topic,
            "Message enqueued"
        );
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_log::MemoryLog;
    use serde_json::json;

    fn request() -> CreateMessageRequest {
        serde_json::from_value(json!({
            "id": "0b6f7c44-8f2f-4c1e-9a51-3f9d7f0e2a10",
            "conversationId": "conv-1",
            "senderId": "alice",
            "content": "hi there",
            "metadata": {"replyTo": "m0"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_publishes_one_record_keyed_by_conversation() {
        let log = MemoryLog::new();
        let service = MessageService::new(Arc::new(log.clone()), "create-message");

        let message = service.create_message(request()).await.unwrap();
        assert_eq!(message.timestamp.timestamp_subsec_nanos() % 1_000_000, 0);

        let records = log.records("create-message");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "conv-1");

        let published: Message = serde_json::from_slice(&records[0].value).unwrap();
        assert_eq!(published, message);
        assert_eq!(published.metadata, Some(json!({"replyTo": "m0"})));
    }

    #[tokio::test]
    async fn test_publish_failure_propagates() {
        let log = MemoryLog::new();
        log.fail_next_sends(1);
        let service = MessageService::new(Arc::new(log.clone()), "create-message");

        let err = service.create_message(request()).await.unwrap_err();
        assert!(matches!(err, AppError::Publish(_)));
        assert!(log.records("create-message").is_empty());
    }
}
