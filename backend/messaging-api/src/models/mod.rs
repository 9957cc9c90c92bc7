pub mod messages;
pub mod pagination;

pub use messages::{CreateMessageRequest, CreateMessageResponse};
pub use pagination::{ConversationMessagesQuery, MessagePage, PageCursor, SearchMessagesQuery, SortBy};
