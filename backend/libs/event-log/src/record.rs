//! Records as they go into and come out of the log.

/// A record to append to a topic.
///
/// `key` decides the partition, so every record for one conversation lands on
/// the same partition and keeps its relative order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    pub key: String,
    pub value: Vec<u8>,
}

impl OutboundRecord {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A record delivered to a batch consumer, with the coordinates needed to
/// commit or rewind past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
}

impl InboundRecord {
    pub fn payload_str(&self) -> Option<&str> {
        self.payload
            .as_deref()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}

/// Lowest and highest offset seen per `(topic, partition)` in a batch.
///
/// Commits use `highest + 1`; a rewind seeks back to `lowest`.
pub(crate) fn offset_bounds(batch: &[InboundRecord]) -> Vec<(String, i32, i64, i64)> {
    let mut bounds: Vec<(String, i32, i64, i64)> = Vec::new();
    for record in batch {
        match bounds
            .iter_mut()
            .find(|(topic, partition, _, _)| topic == &record.topic && *partition == record.partition)
        {
            Some(entry) => {
                entry.2 = entry.2.min(record.offset);
                entry.3 = entry.3.max(record.offset);
            }
            None => bounds.push((
                record.topic.clone(),
                record.partition,
                record.offset,
                record.offset,
            )),
        }
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(partition: i32, offset: i64) -> InboundRecord {
        InboundRecord {
            topic: "create-message".to_string(),
            partition,
            offset,
            key: None,
            payload: Some(b"{}".to_vec()),
        }
    }

    #[test]
    fn test_offset_bounds_per_partition() {
        let batch = vec![record(0, 7), record(1, 3), record(0, 5), record(0, 9), record(1, 4)];
        let bounds = offset_bounds(&batch);

        assert_eq!(bounds.len(), 2);
        assert!(bounds.contains(&("create-message".to_string(), 0, 5, 9)));
        assert!(bounds.contains(&("create-message".to_string(), 1, 3, 4)));
    }

    #[test]
    fn test_payload_str_rejects_invalid_utf8() {
        let mut r = record(0, 0);
        r.payload = Some(vec![0xff, 0xfe]);
        assert_eq!(r.payload_str(), None);

        r.payload = None;
        assert_eq!(r.payload_str(), None);
    }
}
