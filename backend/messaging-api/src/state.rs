use crate::services::{ConversationService, MessageService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub messages: Arc<MessageService>,
    pub conversations: Arc<ConversationService>,
}
