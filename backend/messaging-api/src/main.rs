use actix_web::{middleware::Logger, web, App, HttpServer};
use event_log::{EventPublisher, KafkaConfig, KafkaEventPublisher};
use message_search::ElasticsearchMessageIndex;
use message_store::PgMessageRepository;
use messaging_api::{
    config::Config,
    error::AppError,
    logging, routes,
    services::{ConversationService, MessageService},
    state::AppState,
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();
    let cfg = Config::from_env()?;

    cfg.database.log_config();
    let pool = db_pool::connect_with_retry(cfg.database.clone())
        .await
        .map_err(|e| AppError::StartServer(format!("db: {e}")))?;
    let repository = Arc::new(PgMessageRepository::new(pool));

    let index = Arc::new(
        ElasticsearchMessageIndex::connect(&cfg.search)
            .await
            .map_err(|e| AppError::StartServer(format!("elasticsearch: {e}")))?,
    );

    let kafka = KafkaConfig::new(&cfg.kafka_brokers, cfg.kafka_client_id.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;
    let publisher = Arc::new(
        KafkaEventPublisher::connect(&kafka)
            .map_err(|e| AppError::StartServer(format!("kafka: {e}")))?,
    );

    let state = AppState {
        messages: Arc::new(MessageService::new(
            publisher.clone(),
            cfg.create_message_topic.clone(),
        )),
        conversations: Arc::new(ConversationService::new(
            repository,
            index,
            cfg.search.message_index.clone(),
            cfg.cursor_mode,
        )),
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, cursor_mode = ?cfg.cursor_mode, "starting messaging-api");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind(&bind_addr)
    .map_err(|e| AppError::StartServer(format!("bind {bind_addr}: {e}")))?
    .run()
    .await
    .map_err(|e| AppError::StartServer(format!("run server: {e}")))?;

    if let Err(e) = publisher.close().await {
        tracing::warn!(error = %e, "Failed to flush producer on shutdown");
    }
    tracing::info!("messaging-api stopped");
    Ok(())
}
