//! Record store for conversation messages.
//!
//! [`MessageRepository`] is the storage seam used by the storage worker and
//! the pagination engine. [`PgMessageRepository`] is the production
//! implementation; [`InMemoryMessageRepository`] backs tests.
//!
//! Writes from the pipeline go through [`MessageRepository::insert_many`],
//! which skips ids that are already stored, so a redelivered batch leaves the
//! table unchanged.

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query;
pub mod repository;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryMessageRepository;
pub use models::{value_contains_nul, Message, PersistedMessage, SenderCount};
pub use postgres::{PgMessageRepository, MIGRATOR};
pub use query::{CursorMode, FindOptions, Keyset, MessageField, MessageFilter, SortDirection, SortKey};
pub use repository::MessageRepository;
