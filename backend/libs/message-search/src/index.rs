use crate::document::MessageDocument;
use crate::error::SearchResult;
use crate::query::{SearchHit, SearchRequest};
use async_trait::async_trait;

#[async_trait]
pub trait MessageSearchIndex: Send + Sync {
    /// Insert or overwrite `documents` by id. A concurrent update of the same
    /// document is retried up to `retry_on_conflict` times by the engine.
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[MessageDocument],
        retry_on_conflict: u32,
    ) -> SearchResult<()>;

    /// Hits in `request.sort` order, resuming strictly after
    /// `request.search_after` when present.
    async fn search(&self, index: &str, request: &SearchRequest) -> SearchResult<Vec<SearchHit>>;
}
