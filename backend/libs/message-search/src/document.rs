use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message as indexed for full-text search.
///
/// Decoded from `message-persisted` records. The indexer only writes
/// documents with a `timestamp`; it stays optional so that documents written
/// by older producers can still be read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDocument {
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}
