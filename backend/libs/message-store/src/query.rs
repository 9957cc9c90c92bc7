//! Filters and sort specifications understood by every [`MessageRepository`].
//!
//! [`MessageRepository`]: crate::MessageRepository

use crate::models::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageField {
    Id,
    ConversationId,
    SenderId,
    Content,
    Metadata,
    Timestamp,
}

impl MessageField {
    pub fn column(self) -> &'static str {
        match self {
            MessageField::Id => "id",
            MessageField::ConversationId => "conversation_id",
            MessageField::SenderId => "sender_id",
            MessageField::Content => "content",
            MessageField::Metadata => "metadata",
            MessageField::Timestamp => "\"timestamp\"",
        }
    }

    /// Key under which the field appears in serialized messages
    pub fn json_key(self) -> &'static str {
        match self {
            MessageField::Id => "id",
            MessageField::ConversationId => "conversationId",
            MessageField::SenderId => "senderId",
            MessageField::Content => "content",
            MessageField::Metadata => "metadata",
            MessageField::Timestamp => "timestamp",
        }
    }

    pub(crate) fn text_value(self, message: &Message) -> Option<&str> {
        match self {
            MessageField::Id => Some(&message.id),
            MessageField::ConversationId => Some(&message.conversation_id),
            MessageField::SenderId => Some(&message.sender_id),
            MessageField::Content => Some(&message.content),
            MessageField::Metadata | MessageField::Timestamp => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: MessageField,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: MessageField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: MessageField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }

    fn compare(&self, a: &Message, b: &Message) -> Ordering {
        let ordering = match self.field {
            MessageField::Timestamp => a.timestamp.cmp(&b.timestamp),
            MessageField::Metadata => Ordering::Equal,
            field => field.text_value(a).cmp(&field.text_value(b)),
        };
        self.direction.apply(ordering)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<SortKey>,
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn sorted_by(sort: Vec<SortKey>) -> Self {
        Self { sort, limit: None }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn compare(&self, a: &Message, b: &Message) -> Ordering {
        self.sort
            .iter()
            .map(|key| key.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// How a keyset cursor bounds the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorMode {
    /// `timestamp {>=,<=} last AND id >= last_id`, two independent range checks.
    /// Rows that share the boundary timestamp but have a smaller id are skipped,
    /// and older rows with a smaller id are filtered out as well.
    Loose,
    /// `(timestamp, id)` compared as a pair in page direction, id ascending,
    /// inclusive of the cursor row itself.
    #[default]
    Composite,
}

impl FromStr for CursorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loose" => Ok(CursorMode::Loose),
            "composite" => Ok(CursorMode::Composite),
            other => Err(format!("unknown cursor mode: {}", other)),
        }
    }
}

/// Resume point for timestamp-ordered pagination within a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyset {
    pub last_timestamp: DateTime<Utc>,
    pub last_id: String,
    pub direction: SortDirection,
    pub mode: CursorMode,
}

impl Keyset {
    pub fn admits(&self, message: &Message) -> bool {
        let id_ok = message.id.as_str() >= self.last_id.as_str();
        match (self.mode, self.direction) {
            (CursorMode::Loose, SortDirection::Asc) => {
                message.timestamp >= self.last_timestamp && id_ok
            }
            (CursorMode::Loose, SortDirection::Desc) => {
                message.timestamp <= self.last_timestamp && id_ok
            }
            (CursorMode::Composite, SortDirection::Asc) => {
                message.timestamp > self.last_timestamp
                    || (message.timestamp == self.last_timestamp && id_ok)
            }
            (CursorMode::Composite, SortDirection::Desc) => {
                message.timestamp < self.last_timestamp
                    || (message.timestamp == self.last_timestamp && id_ok)
            }
        }
    }
}

/// Conjunction of the conditions a message must satisfy. An empty filter
/// matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFilter {
    pub conversation_id: Option<String>,
    pub sender_id: Option<String>,
    pub ids: Option<Vec<String>>,
    pub keyset: Option<Keyset>,
}

impl MessageFilter {
    pub fn conversation(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            ..Default::default()
        }
    }

    pub fn ids(ids: Vec<String>) -> Self {
        Self {
            ids: Some(ids),
            ..Default::default()
        }
    }

    pub fn sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    pub fn after(mut self, keyset: Keyset) -> Self {
        self.keyset = Some(keyset);
        self
    }

    pub fn matches(&self, message: &Message) -> bool {
        self.conversation_id
            .as_ref()
            .map_or(true, |c| &message.conversation_id == c)
            && self
                .sender_id
                .as_ref()
                .map_or(true, |s| &message.sender_id == s)
            && self
                .ids
                .as_ref()
                .map_or(true, |ids| ids.iter().any(|id| id == &message.id))
            && self.keyset.as_ref().map_or(true, |k| k.admits(message))
    }
}
