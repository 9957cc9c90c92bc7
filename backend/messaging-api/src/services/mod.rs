pub mod conversations;
pub mod messages;

pub use conversations::{ConversationService, PAGE_SIZE};
pub use messages::MessageService;
