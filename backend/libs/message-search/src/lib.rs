//! Full-text message index.
//!
//! [`MessageSearchIndex`] is implemented by [`ElasticsearchMessageIndex`] for
//! production and [`InMemoryMessageIndex`] for tests. Queries are always
//! scoped to a single conversation and paged with native search-after tokens.

pub mod document;
pub mod elastic;
pub mod error;
pub mod index;
pub mod memory;
pub mod query;

pub use document::MessageDocument;
pub use elastic::{ElasticsearchMessageIndex, SearchConfig};
pub use error::{SearchError, SearchResult};
pub use index::MessageSearchIndex;
pub use memory::InMemoryMessageIndex;
pub use query::{
    timestamp_sort_value, MessageQuery, SearchHit, SearchRequest, SearchSort, SearchSortField,
    SortOrder,
};
