//! Run against a live cluster:
//! ELASTICSEARCH_URL=http://localhost:9200 cargo test -p message-search -- --ignored

use chrono::{Duration, TimeZone, Utc};
use message_search::{
    ElasticsearchMessageIndex, MessageDocument, MessageQuery, MessageSearchIndex, SearchConfig,
    SearchRequest, SearchSort, SearchSortField, SortOrder,
};

async fn index() -> (ElasticsearchMessageIndex, String) {
    let name = format!("messages-test-{}", uuid::Uuid::new_v4());
    let config = SearchConfig {
        url: std::env::var("ELASTICSEARCH_URL")
            .unwrap_or_else(|_| "http://localhost:9200".to_string()),
        username: std::env::var("ELASTICSEARCH_USER").ok(),
        password: std::env::var("ELASTICSEARCH_PASSWORD").ok(),
        message_index: name.clone(),
    };
    let client = ElasticsearchMessageIndex::connect(&config)
        .await
        .expect("cluster must be reachable");
    (client, name)
}

#[tokio::test]
#[ignore = "Requires Elasticsearch"]
async fn test_upsert_then_page_with_search_after() {
    let (client, name) = index().await;
    let base = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
    let docs: Vec<MessageDocument> = (0..3)
        .map(|i| MessageDocument {
            id: format!("m-{}", i),
            conversation_id: "conv-es".to_string(),
            content: format!("deploy step {}", i),
            timestamp: Some(base + Duration::seconds(i)),
        })
        .collect();

    client.bulk_upsert(&name, &docs, 3).await.unwrap();
    // Same batch again must not fail
    client.bulk_upsert(&name, &docs, 3).await.unwrap();

    // Wait for refresh
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    let mut request = SearchRequest {
        query: MessageQuery {
            conversation_id: "conv-es".to_string(),
            text: Some("deploy".to_string()),
            ids: None,
        },
        sort: vec![
            SearchSort::new(SearchSortField::Timestamp, SortOrder::Desc),
            SearchSort::new(SearchSortField::Id, SortOrder::Asc),
        ],
        search_after: None,
        size: 2,
        source_fields: Some(vec!["id".to_string(), "timestamp".to_string()]),
    };

    let first = client.search(&name, &request).await.unwrap();
    assert_eq!(first.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["m-2", "m-1"]);

    request.search_after = Some(first[1].sort.clone());
    let rest = client.search(&name, &request).await.unwrap();
    assert_eq!(rest.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["m-0"]);
}
