use message_store::value_contains_nul;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    #[validate(
        length(min = 1, message = "conversationId must not be empty"),
        custom(function = "reject_nul")
    )]
    pub conversation_id: String,
    #[validate(
        length(min = 1, message = "senderId must not be empty"),
        custom(function = "reject_nul")
    )]
    pub sender_id: String,
    #[validate(
        length(min = 1, message = "content must not be empty"),
        custom(function = "reject_nul")
    )]
    pub content: String,
    /// Must be a JSON object when present
    #[serde(default)]
    #[validate(custom(function = "validate_metadata"))]
    pub metadata: Option<Map<String, Value>>,
}

fn validate_uuid(value: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("uuid").with_message("id must be a UUID".into()))
}

/// The store cannot hold NUL in text columns.
fn reject_nul(value: &str) -> Result<(), ValidationError> {
    if value.contains('\0') {
        return Err(ValidationError::new("nul").with_message("must not contain NUL characters".into()));
    }
    Ok(())
}

fn validate_metadata(value: &Map<String, Value>) -> Result<(), ValidationError> {
    let has_nul = value
        .iter()
        .any(|(key, nested)| key.contains('\0') || value_contains_nul(nested));
    if has_nul {
        return Err(ValidationError::new("nul")
            .with_message("metadata must not contain NUL characters".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateMessageResponse {
    pub success: bool,
    pub message: String,
}

impl CreateMessageResponse {
    pub fn enqueued() -> Self {
        Self {
            success: true,
            message: "Message enqueued successfully.".to_string(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            message: reason.into(),
        }
    }
}
