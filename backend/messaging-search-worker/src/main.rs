use event_log::{run_batch_loop, KafkaBatchSource, KafkaConfig};
use message_search::ElasticsearchMessageIndex;
use messaging_search_worker::{config::Config, logging, IndexerConsumer};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cfg = Config::from_env()?;
    tracing::debug!(search = ?cfg.search, "Loaded configuration");

    let index = ElasticsearchMessageIndex::connect(&cfg.search).await?;

    let kafka = KafkaConfig::new(&cfg.kafka_brokers, cfg.kafka_client_id.clone())?;
    // A fresh group indexes the whole topic so the index can be rebuilt
    let source = KafkaBatchSource::connect(
        &kafka,
        &cfg.kafka_group_id,
        &cfg.message_persisted_topic,
        true,
    )?;

    let consumer = IndexerConsumer::new(Arc::new(index), cfg.search.message_index.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    tracing::info!(
        topic = %cfg.message_persisted_topic,
        group_id = %cfg.kafka_group_id,
        index = %cfg.search.message_index,
        "Starting messaging-search-worker"
    );

    let stats = run_batch_loop(source, consumer, cfg.batch_options(), shutdown_rx).await?;

    tracing::info!(
        committed_batches = stats.committed_batches,
        failed_batches = stats.failed_batches,
        committed_records = stats.committed_records,
        "messaging-search-worker stopped"
    );
    Ok(())
}
