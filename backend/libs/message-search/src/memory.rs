use crate::document::MessageDocument;
use crate::error::{SearchError, SearchResult};
use crate::index::MessageSearchIndex;
use crate::query::{
    compare_sort_values, timestamp_sort_value, MessageQuery, SearchHit, SearchRequest, SearchSort,
    SearchSortField, SortOrder,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Index kept in process memory. Matching is a case-insensitive token OR over
/// `content`; `*` matches everything.
#[derive(Clone, Default)]
pub struct InMemoryMessageIndex {
    indices: Arc<RwLock<HashMap<String, HashMap<String, MessageDocument>>>>,
    failing_writes: Arc<AtomicUsize>,
    failing_searches: Arc<AtomicUsize>,
}

impl InMemoryMessageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, AtomicOrdering::SeqCst);
    }

    pub fn fail_next_searches(&self, count: usize) {
        self.failing_searches.store(count, AtomicOrdering::SeqCst);
    }

    pub fn document(&self, index: &str, id: &str) -> Option<MessageDocument> {
        self.indices.read().get(index).and_then(|docs| docs.get(id).cloned())
    }

    pub fn count(&self, index: &str) -> usize {
        self.indices.read().get(index).map_or(0, HashMap::len)
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn matches(query: &MessageQuery, doc: &MessageDocument) -> bool {
    if doc.conversation_id != query.conversation_id {
        return false;
    }
    if let Some(ids) = &query.ids {
        if !ids.contains(&doc.id) {
            return false;
        }
    }
    let Some(text) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return true;
    };
    if text == "*" {
        return true;
    }
    let content = tokens(&doc.content);
    tokens(text).iter().any(|t| content.contains(t))
}

fn sort_value(doc: &MessageDocument, sort: &SearchSort) -> Value {
    match sort.field {
        SearchSortField::Timestamp => doc.timestamp.map(timestamp_sort_value).unwrap_or(Value::Null),
        SearchSortField::Id => Value::String(doc.id.clone()),
    }
}

fn compare_keys(a: &[Value], b: &[Value], sort: &[SearchSort]) -> Ordering {
    for (i, key) in sort.iter().enumerate() {
        let (Some(x), Some(y)) = (a.get(i), b.get(i)) else {
            break;
        };
        let ord = compare_sort_values(x, y);
        let ord = match (key.order, x, y) {
            // Missing values stay last in either direction
            (SortOrder::Desc, Value::Null, _) | (SortOrder::Desc, _, Value::Null) => ord,
            (SortOrder::Desc, _, _) => ord.reverse(),
            (SortOrder::Asc, _, _) => ord,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn project(doc: &MessageDocument, fields: Option<&[String]>) -> SearchResult<Value> {
    let full = serde_json::to_value(doc)?;
    let Some(fields) = fields else {
        return Ok(full);
    };
    let Value::Object(source) = full else {
        return Ok(full);
    };
    let projected: Map<String, Value> = source
        .into_iter()
        .filter(|(k, _)| fields.iter().any(|f| f == k))
        .collect();
    Ok(Value::Object(projected))
}

#[async_trait]
impl MessageSearchIndex for InMemoryMessageIndex {
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[MessageDocument],
        _retry_on_conflict: u32,
    ) -> SearchResult<()> {
        if take_failure(&self.failing_writes) {
            return Err(SearchError::Unavailable("injected write failure".to_string()));
        }

        let mut indices = self.indices.write();
        let docs = indices.entry(index.to_string()).or_default();
        for doc in documents {
            docs.insert(doc.id.clone(), doc.clone());
        }
        Ok(())
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> SearchResult<Vec<SearchHit>> {
        if take_failure(&self.failing_searches) {
            return Err(SearchError::Unavailable("injected search failure".to_string()));
        }

        let request = request.clone().aligned();
        let indices = self.indices.read();
        let Some(docs) = indices.get(index) else {
            return Ok(Vec::new());
        };

        let mut keyed: Vec<(Vec<Value>, &MessageDocument)> = docs
            .values()
            .filter(|doc| matches(&request.query, doc))
            .map(|doc| {
                let key = request.sort.iter().map(|s| sort_value(doc, s)).collect();
                (key, doc)
            })
            .collect();

        keyed.sort_by(|(a, da), (b, db)| {
            compare_keys(a, b, &request.sort).then_with(|| da.id.cmp(&db.id))
        });

        if let Some(after) = &request.search_after {
            keyed.retain(|(key, _)| compare_keys(key, after, &request.sort) == Ordering::Greater);
        }

        keyed
            .into_iter()
            .take(request.size)
            .map(|(sort, doc)| {
                Ok(SearchHit {
                    id: doc.id.clone(),
                    source: project(doc, request.source_fields.as_deref())?,
                    sort,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn doc(id: &str, conversation: &str, content: &str, offset_secs: i64) -> MessageDocument {
        MessageDocument {
            id: id.to_string(),
            conversation_id: conversation.to_string(),
            content: content.to_string(),
            timestamp: Some(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(offset_secs)),
        }
    }

    fn request(text: &str, search_after: Option<Vec<Value>>, size: usize) -> SearchRequest {
        SearchRequest {
            query: MessageQuery {
                conversation_id: "conv-1".to_string(),
                text: Some(text.to_string()),
                ids: None,
            },
            sort: vec![
                SearchSort::new(SearchSortField::Timestamp, SortOrder::Desc),
                SearchSort::new(SearchSortField::Id, SortOrder::Asc),
            ],
            search_after,
            size,
            source_fields: None,
        }
    }

    fn hit_ids(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_text_match_scoped_to_conversation() {
        let index = InMemoryMessageIndex::new();
        index
            .bulk_upsert(
                "messages",
                &[
                    doc("a", "conv-1", "Hello world", 0),
                    doc("b", "conv-1", "goodbye", 1),
                    doc("c", "conv-2", "hello again", 2),
                ],
                3,
            )
            .await
            .unwrap();

        let hits = index.search("messages", &request("HELLO", None, 10)).await.unwrap();
        assert_eq!(hit_ids(&hits), vec!["a"]);

        let hits = index.search("messages", &request("*", None, 10)).await.unwrap();
        assert_eq!(hit_ids(&hits), vec!["b", "a"]);

        let mut by_id = request("*", None, 10);
        by_id.query.ids = Some(vec!["a".to_string(), "c".to_string()]);
        let hits = index.search("messages", &by_id).await.unwrap();
        assert_eq!(hit_ids(&hits), vec!["a"]);
    }

    #[tokio::test]
    async fn test_search_after_is_exclusive() {
        let index = InMemoryMessageIndex::new();
        let docs = vec![
            doc("a", "conv-1", "ping", 0),
            doc("b", "conv-1", "ping", 5),
            doc("c", "conv-1", "ping", 5),
            doc("d", "conv-1", "ping", 9),
        ];
        index.bulk_upsert("messages", &docs, 3).await.unwrap();

        let first = index.search("messages", &request("ping", None, 2)).await.unwrap();
        assert_eq!(hit_ids(&first), vec!["d", "b"]);

        let next = index
            .search("messages", &request("ping", Some(first[1].sort.clone()), 10))
            .await
            .unwrap();
        assert_eq!(hit_ids(&next), vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_and_projects() {
        let index = InMemoryMessageIndex::new();
        index.bulk_upsert("messages", &[doc("a", "conv-1", "first", 0)], 3).await.unwrap();
        index.bulk_upsert("messages", &[doc("a", "conv-1", "second", 0)], 3).await.unwrap();
        assert_eq!(index.count("messages"), 1);
        assert_eq!(index.document("messages", "a").map(|d| d.content), Some("second".to_string()));

        let mut req = request("second", None, 5);
        req.source_fields = Some(vec!["id".to_string(), "timestamp".to_string()]);
        let hits = index.search("messages", &req).await.unwrap();
        assert_eq!(hits[0].source, json!({ "id": "a", "timestamp": "2025-03-01T12:00:00Z" }));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let index = InMemoryMessageIndex::new();
        index.fail_next_writes(1);
        assert!(index.bulk_upsert("messages", &[doc("a", "conv-1", "x", 0)], 3).await.is_err());
        assert_eq!(index.count("messages"), 0);

        index.fail_next_searches(1);
        assert!(index.search("messages", &request("x", None, 5)).await.is_err());
        assert!(index.search("messages", &request("x", None, 5)).await.unwrap().is_empty());
    }
}
