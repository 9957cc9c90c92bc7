use crate::error::{StoreError, StoreResult};
use crate::models::{Message, SenderCount};
use crate::query::{FindOptions, MessageField, MessageFilter};
use async_trait::async_trait;

/// Storage operations for conversation messages.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find messages matching `filter`.
    ///
    /// # Arguments
    ///
    /// * `filter` - Conditions every returned message satisfies
    /// * `options` - Sort keys applied in order, plus an optional row limit
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find(&self, filter: &MessageFilter, options: &FindOptions)
        -> StoreResult<Vec<Message>>;

    /// Like [`find`](Self::find), but each result only carries `fields`.
    ///
    /// Results are JSON objects keyed by the wire names of the fields.
    async fn find_projected(
        &self,
        filter: &MessageFilter,
        fields: &[MessageField],
        options: &FindOptions,
    ) -> StoreResult<Vec<serde_json::Value>> {
        let messages = self.find(filter, options).await?;
        messages
            .iter()
            .map(|message| project(message, fields))
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Message>>;

    /// First message in `options` order, if any.
    async fn find_one(
        &self,
        filter: &MessageFilter,
        options: &FindOptions,
    ) -> StoreResult<Option<Message>> {
        let options = options.clone().with_limit(1);
        Ok(self.find(filter, &options).await?.into_iter().next())
    }

    /// Insert a single new message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if a message with the same id exists.
    async fn create(&self, message: &Message) -> StoreResult<()>;

    /// Insert messages, silently skipping ids that are already stored.
    ///
    /// Safe to repeat with the same input: the stored state is the same after
    /// the second call as after the first.
    ///
    /// # Returns
    ///
    /// Number of messages that were newly inserted.
    async fn insert_many(&self, messages: &[Message]) -> StoreResult<u64>;

    /// Delete all messages matching `filter`, returning how many were removed.
    async fn delete_many(&self, filter: &MessageFilter) -> StoreResult<u64>;

    /// Message count per sender among messages matching `filter`, largest
    /// first, ties by sender id.
    async fn aggregate(&self, filter: &MessageFilter) -> StoreResult<Vec<SenderCount>>;

    /// Distinct values of a text field among messages matching `filter`,
    /// sorted ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidQuery`] for non-text fields.
    async fn distinct(&self, field: MessageField, filter: &MessageFilter)
        -> StoreResult<Vec<String>>;
}

pub(crate) fn project(message: &Message, fields: &[MessageField]) -> StoreResult<serde_json::Value> {
    let full = serde_json::to_value(message)
        .map_err(|e| StoreError::InvalidQuery(format!("cannot serialize message: {}", e)))?;
    let mut projected = serde_json::Map::new();
    for field in fields {
        let key = field.json_key();
        if let Some(value) = full.get(key) {
            projected.insert(key.to_string(), value.clone());
        }
    }
    Ok(serde_json::Value::Object(projected))
}

pub(crate) fn ensure_text_field(field: MessageField) -> StoreResult<()> {
    match field {
        MessageField::Metadata | MessageField::Timestamp => Err(StoreError::InvalidQuery(format!(
            "distinct is only supported on text fields, got {:?}",
            field
        ))),
        _ => Ok(()),
    }
}

/// Postgres rejects the whole statement when any row holds a NUL.
pub(crate) fn ensure_storable(batch: &[Message]) -> StoreResult<()> {
    match batch.iter().find_map(|m| m.nul_field().map(|f| (&m.id, f))) {
        Some((id, field)) => Err(StoreError::InvalidQuery(format!(
            "message {} has a NUL character in {}",
            id, field
        ))),
        None => Ok(()),
    }
}
