//! In-process log used by tests and local development.
//!
//! Every topic is a single partition. Consumer groups track their committed
//! offset the same way Kafka does, so redelivery after a failed batch and
//! resumption after a restart both behave like the real thing.

use crate::consumer::BatchSource;
use crate::error::{LogError, LogResult};
use crate::producer::EventPublisher;
use crate::record::{offset_bounds, InboundRecord, OutboundRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct State {
    topics: HashMap<String, Vec<OutboundRecord>>,
    /// (group, topic) -> next offset to deliver after a restart
    committed: HashMap<(String, String), i64>,
    failing_sends: usize,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct MemoryLog {
    state: Arc<Mutex<State>>,
    appended: Arc<Notify>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to `send` fail without appending anything.
    pub fn fail_next_sends(&self, count: usize) {
        self.state.lock().failing_sends = count;
    }

    pub fn records(&self, topic: &str) -> Vec<OutboundRecord> {
        self.state
            .lock()
            .topics
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    /// Append a raw payload, bypassing failure injection.
    pub fn append_raw(&self, topic: &str, key: &str, payload: impl Into<Vec<u8>>) {
        self.state
            .lock()
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(OutboundRecord::new(key, payload));
        self.appended.notify_waiters();
    }

    pub fn committed_offset(&self, group_id: &str, topic: &str) -> Option<i64> {
        self.state
            .lock()
            .committed
            .get(&(group_id.to_string(), topic.to_string()))
            .copied()
    }

    /// Join `group_id` on `topic`, starting at the group's committed offset if
    /// it has one.
    pub fn subscribe(&self, group_id: &str, topic: &str, from_beginning: bool) -> MemoryBatchSource {
        let position = {
            let state = self.state.lock();
            match state.committed.get(&(group_id.to_string(), topic.to_string())) {
                Some(offset) => *offset,
                None if from_beginning => 0,
                None => state.topics.get(topic).map_or(0, |r| r.len() as i64),
            }
        };

        MemoryBatchSource {
            log: self.clone(),
            group_id: group_id.to_string(),
            topic: topic.to_string(),
            position,
            heartbeats: 0,
        }
    }

    fn read_from(&self, topic: &str, position: i64, max_records: usize) -> Vec<InboundRecord> {
        let state = self.state.lock();
        let Some(records) = state.topics.get(topic) else {
            return Vec::new();
        };

        records
            .iter()
            .enumerate()
            .skip(position.max(0) as usize)
            .take(max_records)
            .map(|(offset, record)| InboundRecord {
                topic: topic.to_string(),
                partition: 0,
                offset: offset as i64,
                key: Some(record.key.clone().into_bytes()),
                payload: Some(record.value.clone()),
            })
            .collect()
    }
}

#[async_trait]
impl EventPublisher for MemoryLog {
    async fn send(&self, topic: &str, records: Vec<OutboundRecord>) -> LogResult<()> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(LogError::Closed);
            }
            if state.failing_sends > 0 {
                state.failing_sends -= 1;
                return Err(LogError::Unavailable(format!("broker for {} is down", topic)));
            }
            state
                .topics
                .entry(topic.to_string())
                .or_default()
                .extend(records);
        }
        self.appended.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> LogResult<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}

pub struct MemoryBatchSource {
    log: MemoryLog,
    group_id: String,
    topic: String,
    position: i64,
    heartbeats: u64,
}

impl MemoryBatchSource {
    pub fn heartbeats(&self) -> u64 {
        self.heartbeats
    }
}

#[async_trait]
impl BatchSource for MemoryBatchSource {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn next_batch(
        &mut self,
        max_records: usize,
        max_wait: Duration,
    ) -> LogResult<Vec<InboundRecord>> {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            // Register interest before reading so an append between the read
            // and the wait is not missed
            let appended = self.log.appended.notified();
            tokio::pin!(appended);
            appended.as_mut().enable();

            let batch = self.log.read_from(&self.topic, self.position, max_records);
            if !batch.is_empty() {
                self.position = batch.last().map_or(self.position, |r| r.offset + 1);
                return Ok(batch);
            }

            if tokio::time::timeout_at(deadline, appended).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn commit(&mut self, batch: &[InboundRecord]) -> LogResult<()> {
        let mut state = self.log.state.lock();
        for (topic, _, _, highest) in offset_bounds(batch) {
            let entry = state
                .committed
                .entry((self.group_id.clone(), topic))
                .or_insert(0);
            *entry = (*entry).max(highest + 1);
        }
        Ok(())
    }

    async fn rewind(&mut self, batch: &[InboundRecord]) -> LogResult<()> {
        if let Some((_, _, lowest, _)) = offset_bounds(batch).into_iter().next() {
            self.position = self.position.min(lowest);
        }
        Ok(())
    }

    async fn heartbeat(&mut self) -> LogResult<()> {
        self.heartbeats += 1;
        Ok(())
    }

    async fn close(&mut self) -> LogResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_group_starts_at_end_unless_from_beginning() {
        let log = MemoryLog::new();
        log.append_raw("create-message", "c1", "old");

        let mut latest = log.subscribe("storage", "create-message", false);
        let mut earliest = log.subscribe("search", "create-message", true);

        assert!(latest
            .next_batch(10, Duration::from_millis(10))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            earliest
                .next_batch(10, Duration::from_millis(10))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_rewind_redelivers_batch() {
        let log = MemoryLog::new();
        let mut source = log.subscribe("storage", "create-message", true);
        log.append_raw("create-message", "c1", "a");
        log.append_raw("create-message", "c1", "b");

        let first = source.next_batch(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.len(), 2);

        source.rewind(&first).await.unwrap();
        let again = source.next_batch(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(again, first);
    }

    #[tokio::test]
    async fn test_commit_survives_resubscribe() {
        let log = MemoryLog::new();
        log.append_raw("create-message", "c1", "a");
        log.append_raw("create-message", "c1", "b");

        let mut source = log.subscribe("storage", "create-message", true);
        let batch = source.next_batch(1, Duration::from_millis(10)).await.unwrap();
        source.commit(&batch).await.unwrap();
        assert_eq!(log.committed_offset("storage", "create-message"), Some(1));

        let mut resumed = log.subscribe("storage", "create-message", true);
        let batch = resumed.next_batch(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].payload.as_deref(), Some(&b"b"[..]));
    }

    #[tokio::test]
    async fn test_waiting_batch_wakes_on_append() {
        let log = MemoryLog::new();
        let mut source = log.subscribe("storage", "create-message", true);

        let producer = log.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer
                .send("create-message", vec![OutboundRecord::new("c1", "late")])
                .await
                .unwrap();
        });

        let batch = source.next_batch(10, Duration::from_secs(5)).await.unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_send_appends_nothing() {
        let log = MemoryLog::new();
        log.fail_next_sends(1);

        let result = log
            .send("create-message", vec![OutboundRecord::new("c1", "x")])
            .await;
        assert!(matches!(result, Err(LogError::Unavailable(_))));
        assert!(log.records("create-message").is_empty());

        log.send("create-message", vec![OutboundRecord::new("c1", "x")])
            .await
            .unwrap();
        assert_eq!(log.records("create-message").len(), 1);
    }
}
