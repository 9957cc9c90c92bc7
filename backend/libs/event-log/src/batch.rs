//! The consume loop: pull a bounded batch, hand it to a handler, commit only
//! if the handler succeeded, otherwise rewind so the same records come back.

use crate::consumer::BatchSource;
use crate::error::LogResult;
use crate::metrics;
use crate::record::InboundRecord;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Processes one batch at a time.
///
/// Returning `Err` leaves the batch uncommitted, so the whole batch is
/// delivered again; handlers must be safe to repeat.
#[async_trait]
pub trait BatchHandler: Send + Sync {
    type Error: std::fmt::Display + Send;

    async fn handle_batch(&self, records: &[InboundRecord]) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone)]
pub struct BatchLoopOptions {
    pub max_batch_size: usize,
    pub max_wait: Duration,
    pub heartbeat_interval: Duration,
    /// Pause after a failed batch before pulling again
    pub failure_backoff: Duration,
}

impl Default for BatchLoopOptions {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            max_wait: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(3),
            failure_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchLoopStats {
    pub committed_batches: u64,
    pub failed_batches: u64,
    pub committed_records: u64,
}

/// Run until `shutdown` flips to `true` (or its sender goes away).
///
/// Batches are processed strictly one after another. A batch that is already
/// being handled when shutdown arrives is allowed to finish.
pub async fn run_batch_loop<S, H>(
    mut source: S,
    handler: H,
    options: BatchLoopOptions,
    mut shutdown: watch::Receiver<bool>,
) -> LogResult<BatchLoopStats>
where
    S: BatchSource,
    H: BatchHandler,
{
    let topic = source.topic().to_string();
    let mut stats = BatchLoopStats::default();

    info!(
        topic = %topic,
        max_batch_size = options.max_batch_size,
        max_wait_ms = options.max_wait.as_millis() as u64,
        "Batch consumer started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        let next = tokio::select! {
            next = source.next_batch(options.max_batch_size, options.max_wait) => next,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        let batch = match next {
            Ok(batch) => batch,
            Err(e) => {
                error!(topic = %topic, error = %e, "Failed to fetch batch");
                if wait_or_shutdown(options.failure_backoff, &mut shutdown).await {
                    break;
                }
                continue;
            }
        };

        if batch.is_empty() {
            if let Err(e) = source.heartbeat().await {
                warn!(topic = %topic, error = %e, "Heartbeat failed while idle");
            }
            continue;
        }

        debug!(topic = %topic, count = batch.len(), "Processing batch");

        match handle_with_heartbeat(&mut source, &handler, &batch, options.heartbeat_interval).await
        {
            Ok(()) => match source.commit(&batch).await {
                Ok(()) => {
                    stats.committed_batches += 1;
                    stats.committed_records += batch.len() as u64;
                    metrics::record_batch(&topic, true);
                    info!(topic = %topic, count = batch.len(), "Batch processed and committed");
                }
                Err(e) => {
                    // The work is done; a lost commit only means a harmless redelivery
                    warn!(topic = %topic, error = %e, "Failed to commit offsets");
                }
            },
            Err(e) => {
                stats.failed_batches += 1;
                metrics::record_batch(&topic, false);
                error!(
                    topic = %topic,
                    count = batch.len(),
                    error = %e,
                    "Failed to process batch - NOT committing offsets"
                );

                if let Err(e) = source.rewind(&batch).await {
                    error!(topic = %topic, error = %e, "Failed to rewind after batch failure");
                }
                if wait_or_shutdown(options.failure_backoff, &mut shutdown).await {
                    break;
                }
            }
        }
    }

    info!(
        topic = %topic,
        committed_batches = stats.committed_batches,
        failed_batches = stats.failed_batches,
        "Batch consumer shutting down"
    );
    source.close().await?;
    Ok(stats)
}

async fn handle_with_heartbeat<S, H>(
    source: &mut S,
    handler: &H,
    batch: &[InboundRecord],
    every: Duration,
) -> Result<(), H::Error>
where
    S: BatchSource,
    H: BatchHandler,
{
    let every = every.max(Duration::from_millis(1));
    let work = handler.handle_batch(batch);
    tokio::pin!(work);
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);

    loop {
        tokio::select! {
            result = &mut work => return result,
            _ = ticker.tick() => {
                if let Err(e) = source.heartbeat().await {
                    warn!(topic = %source.topic(), error = %e, "Heartbeat failed during batch");
                }
            }
        }
    }
}

/// Sleep for `delay`; returns true if shutdown was requested meanwhile.
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => *shutdown.borrow(),
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
