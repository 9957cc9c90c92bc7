use crate::error::AppError;
use db_pool::env_utils::{parse_env_optional, parse_env_required, parse_env_with_default};
use db_pool::DbConfig;
use dotenvy::dotenv;
use message_search::SearchConfig;
use message_store::CursorMode;

pub const SERVICE_NAME: &str = "messaging-api";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub kafka_brokers: String,
    pub kafka_client_id: String,
    pub create_message_topic: String,
    pub database: DbConfig,
    pub search: SearchConfig,
    pub cursor_mode: CursorMode,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let kafka_brokers = parse_env_required::<String>("KAFKA_BROKERS").map_err(AppError::Config)?;
        let database = DbConfig::from_env(SERVICE_NAME).map_err(AppError::Config)?;
        let search = SearchConfig {
            url: parse_env_required("ELASTICSEARCH_URL").map_err(AppError::Config)?,
            username: parse_env_optional("ELASTICSEARCH_USER"),
            password: parse_env_optional("ELASTICSEARCH_PASSWORD"),
            message_index: parse_env_optional("ELASTICSEARCH_MESSAGE_INDEX")
                .unwrap_or_else(|| "messages".to_string()),
        };

        let cursor_mode = match std::env::var("PAGINATION_CURSOR_MODE") {
            Ok(raw) => raw.parse::<CursorMode>().map_err(AppError::Config)?,
            Err(_) => CursorMode::default(),
        };

        Ok(Self {
            port: parse_env_with_default("PORT", 4000),
            kafka_brokers,
            kafka_client_id: parse_env_optional("KAFKA_CLIENT_ID")
                .unwrap_or_else(|| SERVICE_NAME.to_string()),
            create_message_topic: parse_env_optional("KAFKA_CREATE_MESSAGE_TOPIC")
                .unwrap_or_else(|| "create-message".to_string()),
            database,
            search,
            cursor_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "KAFKA_BROKERS",
        "DATABASE_URL",
        "ELASTICSEARCH_URL",
        "PAGINATION_CURSOR_MODE",
        "PORT",
        "KAFKA_CREATE_MESSAGE_TOPIC",
    ];

    fn set_required() {
        for key in VARS {
            std::env::remove_var(key);
        }
        std::env::set_var("KAFKA_BROKERS", "localhost:9092");
        std::env::set_var("DATABASE_URL", "postgres://localhost/messages");
        std::env::set_var("ELASTICSEARCH_URL", "http://localhost:9200");
    }

    fn clear() {
        for key in VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        set_required();
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.create_message_topic, "create-message");
        assert_eq!(config.cursor_mode, CursorMode::Composite);
        assert_eq!(config.search.message_index, "messages");
        clear();
    }

    #[test]
    #[serial]
    fn test_cursor_mode_override() {
        set_required();
        std::env::set_var("PAGINATION_CURSOR_MODE", "Loose");
        assert_eq!(Config::from_env().unwrap().cursor_mode, CursorMode::Loose);

        std::env::set_var("PAGINATION_CURSOR_MODE", "strict");
        assert!(matches!(Config::from_env(), Err(AppError::Config(_))));
        clear();
    }
}
