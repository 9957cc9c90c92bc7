//! Create through the API, let both workers run over the in-memory log, then
//! read the message back through both pagination paths.

mod common;

use common::{Harness, CREATE_TOPIC, INDEX};
use event_log::{run_batch_loop, BatchLoopOptions};
use message_store::CursorMode;
use messaging_api::models::{CreateMessageRequest, SortBy};
use messaging_search_worker::IndexerConsumer;
use messaging_storage_worker::StorageConsumer;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const PERSISTED_TOPIC: &str = "message-persisted";

fn options() -> BatchLoopOptions {
    BatchLoopOptions {
        max_batch_size: 100,
        max_wait: Duration::from_millis(20),
        heartbeat_interval: Duration::from_millis(10),
        failure_backoff: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn test_created_message_becomes_listable_and_searchable() {
    let h = Harness::new(CursorMode::Composite);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let storage = StorageConsumer::new(
        Arc::new(h.repo.clone()),
        Arc::new(h.log.clone()),
        PERSISTED_TOPIC,
    );
    let storage_task = tokio::spawn(run_batch_loop(
        h.log.subscribe("messaging-storage-worker", CREATE_TOPIC, false),
        storage,
        options(),
        shutdown_rx.clone(),
    ));

    let indexer = IndexerConsumer::new(Arc::new(h.index.clone()), INDEX);
    let indexer_task = tokio::spawn(run_batch_loop(
        h.log.subscribe("messaging-search-worker", PERSISTED_TOPIC, true),
        indexer,
        options(),
        shutdown_rx,
    ));

    let request: CreateMessageRequest = serde_json::from_value(json!({
        "id": "5d0c3c7e-2f4a-4d8e-8b7a-0f1e2d3c4b5a",
        "conversationId": "conv-rt",
        "senderId": "bob",
        "content": "round trip works",
        "metadata": {"thread": 7}
    }))
    .unwrap();
    let created = h.state.messages.create_message(request).await.unwrap();

    let listed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let page = h
                .state
                .conversations
                .get_messages("conv-rt", None, SortBy::TimeDesc)
                .await
                .unwrap();
            if let Some(message) = page.messages.into_iter().next() {
                return message;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("message never reached the record store");
    assert_eq!(listed, created);
    assert_eq!(listed.metadata, Some(json!({"thread": 7})));

    let found = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let page = h
                .state
                .conversations
                .search_messages("conv-rt", "trip", None, SortBy::TimeDesc)
                .await
                .unwrap();
            if !page.messages.is_empty() {
                return page.messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("message never reached the search index");
    assert_eq!(found, vec![created]);

    shutdown_tx.send(true).unwrap();
    storage_task.await.unwrap().unwrap();
    indexer_task.await.unwrap().unwrap();
}
