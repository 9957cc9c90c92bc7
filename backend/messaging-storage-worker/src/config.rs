use crate::error::ConsumerError;
use db_pool::env_utils::{parse_env_optional, parse_env_required, parse_env_with_default};
use db_pool::DbConfig;
use dotenvy::dotenv;
use event_log::BatchLoopOptions;
use std::time::Duration;

pub const SERVICE_NAME: &str = "messaging-storage-worker";

#[derive(Debug, Clone)]
pub struct Config {
    pub kafka_brokers: String,
    pub kafka_client_id: String,
    pub kafka_group_id: String,
    pub create_message_topic: String,
    pub message_persisted_topic: String,
    pub batch_size: usize,
    pub batch_max_wait_ms: u64,
    pub database: DbConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConsumerError> {
        dotenv().ok();

        let kafka_brokers =
            parse_env_required::<String>("KAFKA_BROKERS").map_err(ConsumerError::Config)?;
        let database = DbConfig::from_env(SERVICE_NAME).map_err(ConsumerError::Config)?;

        Ok(Self {
            kafka_brokers,
            kafka_client_id: parse_env_optional("KAFKA_CLIENT_ID")
                .unwrap_or_else(|| SERVICE_NAME.to_string()),
            kafka_group_id: parse_env_optional("KAFKA_GROUP_ID")
                .unwrap_or_else(|| SERVICE_NAME.to_string()),
            create_message_topic: parse_env_optional("KAFKA_CREATE_MESSAGE_TOPIC")
                .unwrap_or_else(|| "create-message".to_string()),
            message_persisted_topic: parse_env_optional("KAFKA_MESSAGE_PERSISTED_TOPIC")
                .unwrap_or_else(|| "message-persisted".to_string()),
            batch_size: parse_env_with_default("KAFKA_BATCH_SIZE", 100),
            batch_max_wait_ms: parse_env_with_default("KAFKA_BATCH_MAX_WAIT_MS", 5000),
            database,
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

    const VARS: [&str; 8] = [
        "KAFKA_BROKERS",
        "KAFKA_CLIENT_ID",
        "KAFKA_GROUP_ID",
        "KAFKA_CREATE_MESSAGE_TOPIC",
        "KAFKA_MESSAGE_PERSISTED_TOPIC",
        "KAFKA_BATCH_SIZE",
        "KAFKA_BATCH_MAX_WAIT_MS",
        "DATABASE_URL",
    ];

    fn clear() {
        for key in VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        std::env::set_var("KAFKA_BROKERS", "localhost:9092");
        std::env::set_var("DATABASE_URL", "postgres://localhost/messages");

        let config = Config::from_env().unwrap();
        assert_eq!(config.kafka_group_id, SERVICE_NAME);
        assert_eq!(config.kafka_client_id, SERVICE_NAME);
        assert_eq!(config.create_message_topic, "create-message");
        assert_eq!(config.message_persisted_topic, "message-persisted");

        let options = config.batch_options();
        assert_eq!(options.max_batch_size, 100);
        assert_eq!(options.max_wait, Duration::from_secs(5));
        clear();
    }

    #[test]
    #[serial]
    fn test_missing_brokers_is_a_config_error() {
        clear();
        std::env::set_var("DATABASE_URL", "postgres://localhost/messages");
        assert!(matches!(Config::from_env(), Err(ConsumerError::Config(_))));
        clear();
    }
}
