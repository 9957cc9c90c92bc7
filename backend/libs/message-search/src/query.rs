use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Sortable document fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSortField {
    Timestamp,
    Id,
}

impl SearchSortField {
    pub fn name(self) -> &'static str {
        match self {
            SearchSortField::Timestamp => "timestamp",
            SearchSortField::Id => "id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSort {
    pub field: SearchSortField,
    pub order: SortOrder,
}

impl SearchSort {
    pub fn new(field: SearchSortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    fn to_json(self) -> Value {
        json!({ self.field.name(): { "order": self.order.as_str() } })
    }
}

/// Messages of one conversation, optionally narrowed by a free-text query
/// and a set of ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub conversation_id: String,
    pub text: Option<String>,
    pub ids: Option<Vec<String>>,
}

impl MessageQuery {
    pub fn to_json(&self) -> Value {
        let mut must = vec![json!({ "term": { "conversationId": self.conversation_id } })];
        if let Some(text) = self.text.as_deref().filter(|t| !t.trim().is_empty()) {
            must.push(json!({ "query_string": { "query": text } }));
        }
        if let Some(ids) = &self.ids {
            must.push(json!({ "terms": { "id": ids } }));
        }
        json!({ "bool": { "must": must } })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: MessageQuery,
    pub sort: Vec<SearchSort>,
    /// Native search-after token; positions correspond to `sort`
    pub search_after: Option<Vec<Value>>,
    pub size: usize,
    /// Restrict `_source` to these fields
    pub source_fields: Option<Vec<String>>,
}

impl SearchRequest {
    /// Trim `sort` and `search_after` to the same length.
    ///
    /// Trailing sort keys without a cursor value are dropped, as are cursor
    /// values beyond the last sort key. Without a cursor the sort is untouched.
    pub fn aligned(mut self) -> Self {
        if let Some(after) = self.search_after.as_mut() {
            if after.is_empty() {
                self.search_after = None;
            } else if !self.sort.is_empty() {
                let len = self.sort.len().min(after.len());
                self.sort.truncate(len);
                after.truncate(len);
            }
        }
        self
    }

    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "query": self.query.to_json(),
            "size": self.size,
        });

        if !self.sort.is_empty() {
            body["sort"] = Value::Array(self.sort.iter().map(|s| s.to_json()).collect());
        }
        if let Some(after) = self.search_after.as_ref().filter(|a| !a.is_empty()) {
            body["search_after"] = Value::Array(after.clone());
        }
        if let Some(fields) = &self.source_fields {
            body["_source"] = json!(fields);
        }
        body
    }
}

/// Search-after value for a timestamp, in the representation the index
/// reports for date sorts (epoch milliseconds).
pub fn timestamp_sort_value(ts: DateTime<Utc>) -> Value {
    json!(ts.timestamp_millis())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub source: Value,
    pub sort: Vec<Value>,
}

impl SearchHit {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.source
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Order two sort values of the same field: numbers numerically, strings
/// byte-wise, missing values last.
pub(crate) fn compare_sort_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_i64()
            .unwrap_or_default()
            .cmp(&y.as_i64().unwrap_or_default()),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(search_after: Option<Vec<Value>>) -> SearchRequest {
        SearchRequest {
            query: MessageQuery {
                conversation_id: "conv-1".to_string(),
                text: Some("hello".to_string()),
                ids: None,
            },
            sort: vec![
                SearchSort::new(SearchSortField::Timestamp, SortOrder::Desc),
                SearchSort::new(SearchSortField::Id, SortOrder::Asc),
            ],
            search_after,
            size: 21,
            source_fields: Some(vec!["id".to_string(), "timestamp".to_string()]),
        }
    }

    #[test]
    fn test_body_shape() {
        let body = request(Some(vec![json!(1_700_000_000_000i64), json!("m-1")])).to_body();

        assert_eq!(body["query"]["bool"]["must"][0]["term"]["conversationId"], "conv-1");
        assert_eq!(body["query"]["bool"]["must"][1]["query_string"]["query"], "hello");
        assert_eq!(body["sort"][0]["timestamp"]["order"], "desc");
        assert_eq!(body["sort"][1]["id"]["order"], "asc");
        assert_eq!(body["search_after"], json!([1_700_000_000_000i64, "m-1"]));
        assert_eq!(body["size"], 21);
        assert_eq!(body["_source"], json!(["id", "timestamp"]));
    }

    #[test]
    fn test_ids_become_a_terms_clause() {
        let query = MessageQuery {
            conversation_id: "conv-1".to_string(),
            text: Some("hello".to_string()),
            ids: Some(vec!["m-1".to_string()]),
        };
        assert_eq!(query.to_json()["bool"]["must"][2]["terms"]["id"], json!(["m-1"]));
    }

    #[test]
    fn test_blank_text_only_filters_by_conversation() {
        let query = MessageQuery {
            conversation_id: "conv-1".to_string(),
            text: Some("   ".to_string()),
            ids: None,
        };
        assert_eq!(query.to_json()["bool"]["must"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_aligned_trims_sort_to_cursor_length() {
        let aligned = request(Some(vec![json!(1)])).aligned();
        assert_eq!(aligned.sort.len(), 1);
        assert_eq!(aligned.sort[0].field, SearchSortField::Timestamp);
    }

    #[test]
    fn test_aligned_trims_cursor_to_sort_length() {
        let mut req = request(Some(vec![json!(1), json!("a"), json!("extra")]));
        req = req.aligned();
        assert_eq!(req.sort.len(), 2);
        assert_eq!(req.search_after, Some(vec![json!(1), json!("a")]));
    }

    #[test]
    fn test_aligned_without_cursor_keeps_sort() {
        let aligned = request(None).aligned();
        assert_eq!(aligned.sort.len(), 2);
        assert!(aligned.to_body().get("search_after").is_none());

        let aligned = request(Some(vec![])).aligned();
        assert_eq!(aligned.search_after, None);
    }

    #[test]
    fn test_hit_timestamp_parses_source() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let hit = SearchHit {
            id: "m-1".to_string(),
            source: json!({ "id": "m-1", "timestamp": "2025-01-02T03:04:05Z" }),
            sort: vec![timestamp_sort_value(ts), json!("m-1")],
        };
        assert_eq!(hit.timestamp(), Some(ts));
        assert_eq!(hit.sort[0], json!(ts.timestamp_millis()));
    }
}
