//! Process-local record store for tests and local runs.

use crate::error::{StoreError, StoreResult};
use crate::models::{Message, SenderCount};
use crate::query::{FindOptions, MessageField, MessageFilter};
use crate::repository::{ensure_storable, ensure_text_field, MessageRepository};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct InMemoryMessageRepository {
    messages: Arc<RwLock<HashMap<String, Message>>>,
    failing_writes: Arc<AtomicUsize>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` write calls fail without touching stored data.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    fn check_write(&self) -> StoreResult<()> {
        let failed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn find(
        &self,
        filter: &MessageFilter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Message>> {
        let mut found: Vec<Message> = self
            .messages
            .read()
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();

        found.sort_by(|a, b| options.compare(a, b));
        if let Some(limit) = options.limit {
            found.truncate(limit.max(0) as usize);
        }
        Ok(found)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Message>> {
        Ok(self.messages.read().get(id).cloned())
    }

    async fn create(&self, message: &Message) -> StoreResult<()> {
        self.check_write()?;
        ensure_storable(std::slice::from_ref(message))?;
        let mut messages = self.messages.write();
        if messages.contains_key(&message.id) {
            return Err(StoreError::Duplicate(message.id.clone()));
        }
        messages.insert(message.id.clone(), message.clone());
        Ok(())
    }

    async fn insert_many(&self, batch: &[Message]) -> StoreResult<u64> {
        self.check_write()?;
        ensure_storable(batch)?;
        let mut messages = self.messages.write();
        let mut inserted = 0;
        for message in batch {
            if !messages.contains_key(&message.id) {
                messages.insert(message.id.clone(), message.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn delete_many(&self, filter: &MessageFilter) -> StoreResult<u64> {
        self.check_write()?;
        let mut messages = self.messages.write();
        let before = messages.len();
        messages.retain(|_, m| !filter.matches(m));
        Ok((before - messages.len()) as u64)
    }

    async fn aggregate(&self, filter: &MessageFilter) -> StoreResult<Vec<SenderCount>> {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for message in self.messages.read().values().filter(|m| filter.matches(m)) {
            *counts.entry(message.sender_id.clone()).or_default() += 1;
        }

        let mut result: Vec<SenderCount> = counts
            .into_iter()
            .map(|(sender_id, message_count)| SenderCount {
                sender_id,
                message_count,
            })
            .collect();
        result.sort_by(|a, b| {
            b.message_count
                .cmp(&a.message_count)
                .then_with(|| a.sender_id.cmp(&b.sender_id))
        });
        Ok(result)
    }

    async fn distinct(
        &self,
        field: MessageField,
        filter: &MessageFilter,
    ) -> StoreResult<Vec<String>> {
        ensure_text_field(field)?;
        let values: BTreeSet<String> = self
            .messages
            .read()
            .values()
            .filter(|m| filter.matches(m))
            .filter_map(|m| field.text_value(m).map(String::from))
            .collect();
        Ok(values.into_iter().collect())
    }
}
