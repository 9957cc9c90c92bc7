use crate::error::{LogError, LogResult};
use rdkafka::ClientConfig;

/// Broker connection settings shared by producers and consumers
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub client_id: String,
    pub session_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub max_poll_interval_ms: u64,
}

impl KafkaConfig {
    /// Build from a comma separated broker list such as `kafka-1:9092,kafka-2:9092`
    pub fn new(brokers: &str, client_id: impl Into<String>) -> LogResult<Self> {
        let brokers: Vec<String> = brokers
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(String::from)
            .collect();

        if brokers.is_empty() {
            return Err(LogError::Config("no Kafka brokers configured".to_string()));
        }

        Ok(Self {
            brokers,
            client_id: client_id.into(),
            session_timeout_ms: 30_000,
            heartbeat_interval_ms: 3_000,
            max_poll_interval_ms: 300_000,
        })
    }

    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }

    pub(crate) fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.bootstrap_servers())
            .set("client.id", &self.client_id);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_list_is_trimmed_and_split() {
        let config = KafkaConfig::new(" kafka-1:9092, kafka-2:9092 ,", "messaging-api").unwrap();
        assert_eq!(config.brokers, vec!["kafka-1:9092", "kafka-2:9092"]);
        assert_eq!(config.bootstrap_servers(), "kafka-1:9092,kafka-2:9092");
        assert_eq!(config.client_id, "messaging-api");
    }

    #[test]
    fn test_empty_broker_list_is_rejected() {
        let err = KafkaConfig::new(" , ", "messaging-api").unwrap_err();
        assert!(matches!(err, LogError::Config(_)));
    }
}
