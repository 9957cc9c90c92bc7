use crate::error::ConsumerError;
use db_pool::env_utils::{parse_env_optional, parse_env_required, parse_env_with_default};
use dotenvy::dotenv;
use event_log::BatchLoopOptions;
use message_search::SearchConfig;
use std::time::Duration;

pub const SERVICE_NAME: &str = "messaging-search-worker";

/// Concurrent updates to one document are retried this many times by the
/// index before the item is reported as failed.
pub const RETRY_ON_CONFLICT: u32 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub kafka_brokers: String,
    pub kafka_client_id: String,
    pub kafka_group_id: String,
    pub message_persisted_topic: String,
    pub batch_size: usize,
    pub batch_max_wait_ms: u64,
    pub search: SearchConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConsumerError> {
        dotenv().ok();

        let kafka_brokers =
            parse_env_required::<String>("KAFKA_BROKERS").map_err(ConsumerError::Config)?;
        let search = SearchConfig {
            url: parse_env_required("ELASTICSEARCH_URL").map_err(ConsumerError::Config)?,
            username: parse_env_optional("ELASTICSEARCH_USER"),
            password: parse_env_optional("ELASTICSEARCH_PASSWORD"),
            message_index: parse_env_optional("ELASTICSEARCH_MESSAGE_INDEX")
                .unwrap_or_else(|| "messages".to_string()),
        };

        Ok(Self {
            kafka_brokers,
            kafka_client_id: parse_env_optional("KAFKA_CLIENT_ID")
                .unwrap_or_else(|| SERVICE_NAME.to_string()),
            kafka_group_id: parse_env_optional("KAFKA_GROUP_ID")
                .unwrap_or_else(|| SERVICE_NAME.to_string()),
            message_persisted_topic: parse_env_optional("KAFKA_MESSAGE_PERSISTED_TOPIC")
                .unwrap_or_else(|| "message-persisted".to_string()),
            batch_size: parse_env_with_default("KAFKA_BATCH_SIZE", 100),
            batch_max_wait_ms: parse_env_with_default("KAFKA_BATCH_MAX_WAIT_MS", 5000),
            search,
        })
    }

    pub fn batch_options(&self) -> BatchLoopOptions {
        BatchLoopOptions {
            max_batch_size: self.batch_size.max(1),
            max_wait: Duration::from_millis(self.batch_max_wait_ms),
            ..BatchLoopOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "KAFKA_BROKERS",
        "KAFKA_GROUP_ID",
        "KAFKA_BATCH_SIZE",
        "ELASTICSEARCH_URL",
        "ELASTICSEARCH_USER",
        "ELASTICSEARCH_MESSAGE_INDEX",
    ];

    fn clear() {
        for key in VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_and_overrides() {
        clear();
        std::env::set_var("KAFKA_BROKERS", "k1:9092,k2:9092");
        std::env::set_var("ELASTICSEARCH_URL", "http://localhost:9200");
        std::env::set_var("KAFKA_BATCH_SIZE", "250");

        let config = Config::from_env().unwrap();
        assert_eq!(config.kafka_group_id, SERVICE_NAME);
        assert_eq!(config.search.message_index, "messages");
        assert_eq!(config.search.username, None);
        assert_eq!(config.batch_options().max_batch_size, 250);
        clear();
    }

    #[test]
    #[serial]
    fn test_search_url_is_required() {
        clear();
        std::env::set_var("KAFKA_BROKERS", "localhost:9092");
        assert!(matches!(Config::from_env(), Err(ConsumerError::Config(_))));
        clear();
    }
}
