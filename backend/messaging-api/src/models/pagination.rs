use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use message_store::{Message, SortDirection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    TimeAsc,
    #[default]
    TimeDesc,
    SenderIdAsc,
    SenderIdDesc,
}

impl SortBy {
    /// Direction of the timestamp ordering. Sender sorts are accepted but
    /// fall back to newest first.
    pub fn direction(self) -> SortDirection {
        match self {
            SortBy::TimeAsc => SortDirection::Asc,
            SortBy::TimeDesc | SortBy::SenderIdAsc | SortBy::SenderIdDesc => SortDirection::Desc,
        }
    }

    pub fn is_time_based(self) -> bool {
        matches!(self, SortBy::TimeAsc | SortBy::TimeDesc)
    }
}

/// Where the next page starts: the first message it will contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    pub last_message_id: String,
    pub last_sort_value: DateTime<Utc>,
}

impl PageCursor {
    pub fn from_message(message: &Message) -> Self {
        Self {
            last_message_id: message.id.clone(),
            last_sort_value: message.timestamp,
        }
    }

    fn parse(last_message_id: Option<&str>, last_sort_value: Option<&str>) -> AppResult<Option<Self>> {
        let (Some(last_message_id), Some(raw)) = (
            last_message_id.filter(|s| !s.is_empty()),
            last_sort_value.filter(|s| !s.is_empty()),
        ) else {
            return Ok(None);
        };

        let last_sort_value = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| AppError::BadRequest(format!("lastSortValue is not an RFC 3339 timestamp: {e}")))?
            .with_timezone(&Utc);

        Ok(Some(Self {
            last_message_id: last_message_id.to_string(),
            last_sort_value,
        }))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessagesQuery {
    pub last_message_id: Option<String>,
    pub last_sort_value: Option<String>,
    pub sort_by: Option<SortBy>,
}

impl ConversationMessagesQuery {
    pub fn cursor(&self) -> AppResult<Option<PageCursor>> {
        PageCursor::parse(self.last_message_id.as_deref(), self.last_sort_value.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMessagesQuery {
    pub q: Option<String>,
    pub last_message_id: Option<String>,
    pub last_sort_value: Option<String>,
    pub sort_by: Option<SortBy>,
}

impl SearchMessagesQuery {
    pub fn cursor(&self) -> AppResult<Option<PageCursor>> {
        PageCursor::parse(self.last_message_id.as_deref(), self.last_sort_value.as_deref())
    }

    pub fn search_term(&self) -> AppResult<&str> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::BadRequest("q must not be empty".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<PageCursor>,
}
