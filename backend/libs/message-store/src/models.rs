use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as stored in the record store and carried on
/// `create-message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    /// Uninterpreted caller data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// First field holding a NUL character. Postgres TEXT and JSONB columns
    /// cannot store one, so such a message can never be persisted.
    pub fn nul_field(&self) -> Option<&'static str> {
        [
            ("id", self.id.contains('\0')),
            ("conversationId", self.conversation_id.contains('\0')),
            ("senderId", self.sender_id.contains('\0')),
            ("content", self.content.contains('\0')),
            (
                "metadata",
                self.metadata.as_ref().is_some_and(value_contains_nul),
            ),
        ]
        .into_iter()
        .find_map(|(field, found)| found.then_some(field))
    }

    pub fn persisted(&self) -> PersistedMessage {
        PersistedMessage {
            id: self.id.clone(),
            conversation_id: self.conversation_id.clone(),
            content: self.content.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// True if any string or object key inside `value` contains a NUL character.
pub fn value_contains_nul(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::String(s) => s.contains('\0'),
        serde_json::Value::Array(items) => items.iter().any(value_contains_nul),
        serde_json::Value::Object(map) => map
            .iter()
            .any(|(key, v)| key.contains('\0') || value_contains_nul(v)),
        _ => false,
    }
}

/// What the storage worker republishes on `message-persisted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedMessage {
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SenderCount {
    pub sender_id: String,
    pub message_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Message {
        Message {
            id: "3f6c1d2e-0000-4000-8000-000000000001".to_string(),
            conversation_id: "conv-1".to_string(),
            sender_id: "alice".to_string(),
            content: "hello".to_string(),
            metadata: Some(serde_json::json!({"attachments": [{"kind": "image"}]})),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_message_uses_camel_case_on_the_wire() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["conversationId"], "conv-1");
        assert_eq!(value["senderId"], "alice");
        assert_eq!(value["timestamp"], "2025-03-01T12:00:00Z");
        assert_eq!(value["metadata"]["attachments"][0]["kind"], "image");
    }

    #[test]
    fn test_metadata_is_optional() {
        let json = r#"{"id":"m1","conversationId":"c1","senderId":"s1","content":"hi","timestamp":"2025-03-01T12:00:00.250Z"}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.metadata, None);
        assert_eq!(message.timestamp.timestamp_subsec_millis(), 250);

        let back = serde_json::to_value(&message).unwrap();
        assert!(back.get("metadata").is_none());
    }

    #[test]
    fn test_nul_field_checks_text_and_nested_metadata() {
        assert_eq!(sample().nul_field(), None);

        let mut message = sample();
        message.content = "a\u{0}b".to_string();
        assert_eq!(message.nul_field(), Some("content"));

        let mut message = sample();
        message.metadata = Some(serde_json::json!({"tags": ["ok", "x\u{0}y"]}));
        assert_eq!(message.nul_field(), Some("metadata"));

        let mut message = sample();
        message.metadata = Some(serde_json::json!({"k\u{0}": 1}));
        assert_eq!(message.nul_field(), Some("metadata"));
    }

    #[test]
    fn test_persisted_projection_drops_sender_and_metadata() {
        let projection = serde_json::to_value(sample().persisted()).unwrap();
        let keys: Vec<&str> = projection
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys.len(), 4);
        for key in ["id", "conversationId", "content", "timestamp"] {
            assert!(keys.contains(&key), "missing {}", key);
        }
    }
}
