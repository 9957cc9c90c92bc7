use crate::document::MessageDocument;
use crate::error::{SearchError, SearchResult};
use crate::index::MessageSearchIndex;
use crate::query::{SearchHit, SearchRequest};
use async_trait::async_trait;
use elasticsearch::{
    auth::Credentials,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, Elasticsearch, SearchParts,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Clone)]
pub struct SearchConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub message_index: String,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("message_index", &self.message_index)
            .finish()
    }
}

#[derive(Clone)]
pub struct ElasticsearchMessageIndex {
    client: Elasticsearch,
}

impl ElasticsearchMessageIndex {
    /// Build the client and make sure the message index exists.
    pub async fn connect(config: &SearchConfig) -> SearchResult<Self> {
        let parsed = Url::parse(&config.url)?;
        let pool = SingleNodeConnectionPool::new(parsed);
        let mut builder = TransportBuilder::new(pool);
        if let Some(username) = &config.username {
            builder = builder.auth(Credentials::Basic(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            ));
        }
        let client = Elasticsearch::new(builder.build()?);

        let instance = Self { client };
        instance.health_check().await?;
        instance.ensure_message_index(&config.message_index).await?;

        info!(url = %config.url, index = %config.message_index, "Elasticsearch client ready");
        Ok(instance)
    }

    async fn ensure_message_index(&self, index: &str) -> SearchResult<()> {
        let exists_response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;

        if exists_response.status_code().is_success() {
            return Ok(());
        }

        let body = json!({
            "mappings": {
                "properties": {
                    "id": { "type": "keyword" },
                    "conversationId": { "type": "keyword" },
                    "content": { "type": "text" },
                    "timestamp": { "type": "date" }
                }
            }
        });

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body)
            .send()
            .await?;

        // Another instance may have created it between the two calls
        let status = response.status_code();
        if !status.is_success() && status.as_u16() != 400 {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        info!(index = %index, "Created message index");
        Ok(())
    }

    pub async fn health_check(&self) -> SearchResult<()> {
        let response = self.client.ping().send().await?;
        if response.status_code().is_success() {
            Ok(())
        } else {
            Err(SearchError::Unavailable(format!(
                "ping returned {}",
                response.status_code()
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    errors: bool,
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: InnerHits,
}

#[derive(Debug, Deserialize)]
struct InnerHits {
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Value,
    #[serde(default)]
    sort: Vec<Value>,
}

fn first_bulk_failure(items: &[Value]) -> (usize, String) {
    let failures: Vec<&Value> = items
        .iter()
        .filter_map(|item| item.get("update"))
        .filter(|update| update.get("error").is_some())
        .collect();

    let reason = failures
        .first()
        .and_then(|f| f["error"]["reason"].as_str())
        .unwrap_or("unknown")
        .to_string();
    (failures.len(), reason)
}

#[async_trait]
impl MessageSearchIndex for ElasticsearchMessageIndex {
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[MessageDocument],
        retry_on_conflict: u32,
    ) -> SearchResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        // NDJSON: action line followed by the partial document
        let mut body_lines = Vec::with_capacity(documents.len() * 2);
        for doc in documents {
            let action = json!({
                "update": {
                    "_index": index,
                    "_id": doc.id,
                    "retry_on_conflict": retry_on_conflict
                }
            });
            body_lines.push(serde_json::to_string(&action)?);
            body_lines.push(serde_json::to_string(&json!({ "doc": doc, "doc_as_upsert": true }))?);
        }

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body_lines)
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let result: BulkResponse = response.json().await?;
        if result.errors {
            let (failed, reason) = first_bulk_failure(&result.items);
            warn!(index = %index, failed, reason = %reason, "Bulk upsert reported item failures");
            return Err(SearchError::BulkItems { failed, reason });
        }

        debug!(index = %index, count = documents.len(), "Bulk upsert completed");
        Ok(())
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> SearchResult<Vec<SearchHit>> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(request.clone().aligned().to_body())
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let search_response: SearchResponse = response.json().await?;
        Ok(search_response
            .hits
            .hits
            .into_iter()
            .map(|hit| SearchHit {
                id: hit.id,
                source: hit.source,
                sort: hit.sort,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_bulk_failure_reports_reason() {
        let items = vec![
            json!({ "update": { "_id": "a", "status": 200 } }),
            json!({ "update": { "_id": "b", "status": 409, "error": { "reason": "version conflict" } } }),
            json!({ "update": { "_id": "c", "status": 429, "error": { "reason": "rejected" } } }),
        ];
        assert_eq!(first_bulk_failure(&items), (2, "version conflict".to_string()));
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let config = SearchConfig {
            url: "http://localhost:9200".to_string(),
            username: Some("elastic".to_string()),
            password: Some("changeme".to_string()),
            message_index: "messages".to_string(),
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("changeme"));
        assert!(rendered.contains("elastic"));
    }
}
