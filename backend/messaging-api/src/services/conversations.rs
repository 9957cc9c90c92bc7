//! Keyset pagination over a conversation, either straight from the record
//! store or via the search index followed by a store lookup.

use crate::error::AppResult;
use crate::metrics;
use crate::models::{MessagePage, PageCursor, SortBy};
use chrono::{DateTime, Utc};
use message_search::{
    timestamp_sort_value, MessageQuery, MessageSearchIndex, SearchRequest, SearchSort,
    SearchSortField, SortOrder,
};
use message_store::{
    CursorMode, FindOptions, Keyset, Message, MessageField, MessageFilter, MessageRepository,
    SortDirection, SortKey,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const PAGE_SIZE: usize = 20;

pub struct ConversationService {
    repository: Arc<dyn MessageRepository>,
    index: Arc<dyn MessageSearchIndex>,
    index_name: String,
    cursor_mode: CursorMode,
}

impl ConversationService {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        index: Arc<dyn MessageSearchIndex>,
        index_name: impl Into<String>,
        cursor_mode: CursorMode,
    ) -> Self {
        Self {
            repository,
            index,
            index_name: index_name.into(),
            cursor_mode,
        }
    }

    pub fn cursor_mode(&self) -> CursorMode {
        self.cursor_mode
    }

    /// One page of a conversation read from the record store.
    ///
    /// Fetches one row beyond the page; if it exists it becomes the cursor
    /// for the next request.
    pub async fn get_messages(
        &self,
        conversation_id: &str,
        cursor: Option<PageCursor>,
        sort_by: SortBy,
    ) -> AppResult<MessagePage> {
        let direction = sort_by.direction();

        let mut filter = MessageFilter::conversation(conversation_id);
        if let Some(cursor) = cursor {
            filter = filter.after(Keyset {
                last_timestamp: cursor.last_sort_value,
                last_id: cursor.last_message_id,
                direction,
                mode: self.cursor_mode,
            });
        }

        let options = FindOptions::sorted_by(vec![
            SortKey {
                field: MessageField::Timestamp,
                direction,
            },
            SortKey::asc(MessageField::Id),
        ])
        .with_limit(PAGE_SIZE as i64 + 1);

        let mut messages = self.repository.find(&filter, &options).await?;
        messages.truncate(PAGE_SIZE + 1);
        let overflow = if messages.len() > PAGE_SIZE {
            messages.pop()
        } else {
            None
        };

        metrics::record_page("store");
        Ok(MessagePage {
            messages,
            has_more: overflow.is_some(),
            next_cursor: overflow.as_ref().map(PageCursor::from_message),
        })
    }

    /// One page of search results, hydrated from the record store in hit
    /// order.
    ///
    /// `has_more` and the cursor are decided by the hits, so ids the store
    /// does not (yet) know are dropped from `messages` without shifting pages.
    pub async fn search_messages(
        &self,
        conversation_id: &str,
        search_term: &str,
        cursor: Option<PageCursor>,
        sort_by: SortBy,
    ) -> AppResult<MessagePage> {
        let order = match sort_by.direction() {
            SortDirection::Asc => SortOrder::Asc,
            SortDirection::Desc => SortOrder::Desc,
        };

        // search_after is exclusive; the composite mode puts the cursor row
        // back in front so the next page starts with it, like the store query
        let carried = match (&cursor, self.cursor_mode) {
            (Some(c), CursorMode::Composite) => {
                self.carried_entry(conversation_id, search_term, c).await?
            }
            _ => None,
        };
        let size = if carried.is_some() {
            PAGE_SIZE
        } else {
            PAGE_SIZE + 1
        };

        let request = SearchRequest {
            query: MessageQuery {
                conversation_id: conversation_id.to_string(),
                text: Some(search_term.to_string()),
                ids: None,
            },
            sort: vec![
                SearchSort::new(SearchSortField::Timestamp, order),
                SearchSort::new(SearchSortField::Id, SortOrder::Asc),
            ],
            search_after: cursor.map(|c| {
                vec![
                    timestamp_sort_value(c.last_sort_value),
                    Value::String(c.last_message_id),
                ]
            }),
            size,
            source_fields: Some(vec!["id".to_string(), "timestamp".to_string()]),
        };

        let hits = self.index.search(&self.index_name, &request).await?;

        let carried_id = carried.as_ref().map(|(id, _)| id.clone());
        let mut entries: Vec<(String, Option<DateTime<Utc>>)> = Vec::with_capacity(PAGE_SIZE + 1);
        entries.extend(carried);
        entries.extend(
            hits.iter()
                .filter(|hit| carried_id.as_deref() != Some(hit.id.as_str()))
                .map(|hit| (hit.id.clone(), hit.timestamp())),
        );
        entries.truncate(PAGE_SIZE + 1);

        let overflow = if entries.len() > PAGE_SIZE {
            entries.pop()
        } else {
            None
        };

        let mut ids: Vec<String> = entries.into_iter().map(|(id, _)| id).collect();
        if let Some((id, None)) = &overflow {
            ids.push(id.clone());
        }
        let mut messages = self.hydrate(conversation_id, &ids).await?;

        let next_cursor = match overflow {
            None => None,
            Some((last_message_id, Some(last_sort_value))) => Some(PageCursor {
                last_message_id,
                last_sort_value,
            }),
            // Documents indexed without a timestamp take it from the stored row
            Some((last_message_id, None)) => {
                let stored = messages.last().is_some_and(|m| m.id == last_message_id);
                if stored {
                    messages.pop().map(|m| PageCursor::from_message(&m))
                } else {
                    warn!(
                        conversation_id = %conversation_id,
                        message_id = %last_message_id,
                        "Overflow hit has no timestamp to resume from"
                    );
                    None
                }
            }
        };
        let has_more = next_cursor.is_some();

        debug!(
            conversation_id = %conversation_id,
            hits = hits.len(),
            hydrated = messages.len(),
            has_more,
            "Search page assembled"
        );
        metrics::record_page("search");

        Ok(MessagePage {
            messages,
            has_more,
            next_cursor,
        })
    }

    /// The cursor row, if the index still matches it for `search_term`.
    async fn carried_entry(
        &self,
        conversation_id: &str,
        search_term: &str,
        cursor: &PageCursor,
    ) -> AppResult<Option<(String, Option<DateTime<Utc>>)>> {
        let request = SearchRequest {
            query: MessageQuery {
                conversation_id: conversation_id.to_string(),
                text: Some(search_term.to_string()),
                ids: Some(vec![cursor.last_message_id.clone()]),
            },
            sort: Vec::new(),
            search_after: None,
            size: 1,
            source_fields: Some(vec!["id".to_string()]),
        };

        let hits = self.index.search(&self.index_name, &request).await?;
        Ok(hits
            .first()
            .map(|_| (cursor.last_message_id.clone(), Some(cursor.last_sort_value))))
    }

    /// Load `ids` in one lookup and return them in the given order, skipping
    /// ids with no stored message.
    async fn hydrate(&self, conversation_id: &str, ids: &[String]) -> AppResult<Vec<Message>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let filter = MessageFilter {
            conversation_id: Some(conversation_id.to_string()),
            ids: Some(ids.to_vec()),
            ..Default::default()
        };
        let found = self
            .repository
            .find(&filter, &FindOptions::default().with_limit(ids.len() as i64))
            .await?;

        let mut by_id: HashMap<String, Message> =
            found.into_iter().map(|m| (m.id.clone(), m)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}
