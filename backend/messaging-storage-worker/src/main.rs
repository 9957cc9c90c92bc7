use event_log::{run_batch_loop, EventPublisher, KafkaBatchSource, KafkaConfig, KafkaEventPublisher};
use message_store::PgMessageRepository;
use messaging_storage_worker::{config::Config, logging, ConsumerError, StorageConsumer};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cfg = Config::from_env()?;

    cfg.database.log_config();
    let pool = db_pool::connect_with_retry(cfg.database.clone())
        .await
        .map_err(|e| ConsumerError::Config(format!("db: {e}")))?;
    let repository = PgMessageRepository::new(pool);
    repository.migrate().await?;

    let kafka = KafkaConfig::new(&cfg.kafka_brokers, cfg.kafka_client_id.clone())?;
    let publisher = Arc::new(KafkaEventPublisher::connect(&kafka)?);
    let source = KafkaBatchSource::connect(
        &kafka,
        &cfg.kafka_group_id,
        &cfg.create_message_topic,
        false,
    )?;

    let consumer = StorageConsumer::new(
        Arc::new(repository),
        publisher.clone(),
        cfg.message_persisted_topic.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    tracing::info!(
        topic = %cfg.create_message_topic,
        group_id = %cfg.kafka_group_id,
        "Starting messaging-storage-worker"
    );

    let stats = run_batch_loop(source, consumer, cfg.batch_options(), shutdown_rx).await?;
    if let Err(e) = publisher.close().await {
        tracing::warn!(error = %e, "Failed to flush producer on shutdown");
    }

    tracing::info!(
        committed_batches = stats.committed_batches,
        failed_batches = stats.failed_batches,
        committed_records = stats.committed_records,
        "messaging-storage-worker stopped"
    );
    Ok(())
}
