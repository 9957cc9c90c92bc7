#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use event_log::MemoryLog;
use message_search::{InMemoryMessageIndex, MessageDocument, MessageSearchIndex};
use message_store::{CursorMode, InMemoryMessageRepository, Message, MessageRepository};
use messaging_api::services::{ConversationService, MessageService};
use messaging_api::AppState;
use std::sync::Arc;

pub const INDEX: &str = "messages";
pub const CREATE_TOPIC: &str = "create-message";

pub struct Harness {
    pub log: MemoryLog,
    pub repo: InMemoryMessageRepository,
    pub index: InMemoryMessageIndex,
    pub state: AppState,
}

impl Harness {
    pub fn new(mode: CursorMode) -> Self {
        let log = MemoryLog::new();
        let repo = InMemoryMessageRepository::new();
        let index = InMemoryMessageIndex::new();
        let state = AppState {
            messages: Arc::new(MessageService::new(Arc::new(log.clone()), CREATE_TOPIC)),
            conversations: Arc::new(ConversationService::new(
                Arc::new(repo.clone()),
                Arc::new(index.clone()),
                INDEX,
                mode,
            )),
        };
        Self {
            log,
            repo,
            index,
            state,
        }
    }

    pub fn service(&self) -> &ConversationService {
        &self.state.conversations
    }

    /// Store and index `messages` as the workers would.
    pub async fn seed(&self, messages: &[Message]) {
        self.repo.insert_many(messages).await.unwrap();
        self.index_only(messages).await;
    }

    pub async fn index_only(&self, messages: &[Message]) {
        let docs: Vec<MessageDocument> = messages
            .iter()
            .map(|m| MessageDocument {
                id: m.id.clone(),
                conversation_id: m.conversation_id.clone(),
                content: m.content.clone(),
                timestamp: Some(m.timestamp),
            })
            .collect();
        self.index.bulk_upsert(INDEX, &docs, 3).await.unwrap();
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap()
}

pub fn message(conversation: &str, id: &str, offset_secs: i64, content: &str) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: conversation.to_string(),
        sender_id: "alice".to_string(),
        content: content.to_string(),
        metadata: None,
        timestamp: base_time() + Duration::seconds(offset_secs),
    }
}

/// `count` messages one second apart; `m00` is the oldest.
pub fn numbered(conversation: &str, count: usize, content: &str) -> Vec<Message> {
    (0..count)
        .map(|i| message(conversation, &format!("m{:02}", i), i as i64, content))
        .collect()
}

pub fn ids(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.id.clone()).collect()
}
