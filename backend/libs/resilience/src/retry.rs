/// Retry policy with exponential backoff and jitter
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (`None` retries forever)
    pub max_retries: Option<u32>,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to backoff (±30%)
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Some(3),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Retry forever, sleeping exactly `delay` between attempts
    pub fn fixed_forever(delay: Duration) -> Self {
        Self {
            max_retries: None,
            initial_backoff: delay,
            max_backoff: delay,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    fn exhausted(&self, attempt: u32) -> bool {
        matches!(self.max_retries, Some(max) if attempt > max)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("Max retries ({retries}) exceeded: {last_error}")]
    MaxRetriesExceeded { retries: u32, last_error: E },
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> RetryError<E> {
    /// The underlying error, whichever way the retry loop ended
    pub fn into_inner(self) -> E {
        match self {
            RetryError::MaxRetriesExceeded { last_error, .. } => last_error,
            RetryError::OperationFailed(e) => e,
        }
    }
}

/// Execute a future with retry logic
pub async fn with_retry<F, Fut, T, E>(config: RetryConfig, f: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_when(config, f, |_| true).await
}

/// Execute a future with retry logic, giving up immediately on errors
/// for which `retryable` returns false
pub async fn with_retry_when<F, Fut, T, E, P>(
    config: RetryConfig,
    mut f: F,
    retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt: u32 = 0;
    let mut backoff = config.initial_backoff;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !retryable(&e) {
                    return Err(RetryError::OperationFailed(e));
                }

                attempt = attempt.saturating_add(1);

                if config.exhausted(attempt) {
                    let retries = config.max_retries.unwrap_or(attempt);
                    warn!(error = %e, "Max retries ({}) reached", retries);
                    return Err(RetryError::MaxRetriesExceeded {
                        retries,
                        last_error: e,
                    });
                }

                let delay = calculate_backoff(backoff, config.jitter);

                match config.max_retries {
                    Some(max) => warn!(error = %e, "Retry attempt {}/{}, waiting {:?}", attempt, max, delay),
                    None => warn!(error = %e, "Retry attempt {}, waiting {:?}", attempt, delay),
                }

                tokio::time::sleep(delay).await;

                // Exponential backoff
                backoff = Duration::from_millis(
                    ((backoff.as_millis() as f64 * config.backoff_multiplier)
                        .min(config.max_backoff.as_millis() as f64)) as u64,
                );
            }
        }
    }
}

fn calculate_backoff(base: Duration, jitter: bool) -> Duration {
    if jitter {
        let mut rng = rand::thread_rng();
        let jitter_factor = 1.0 + rng.gen_range(-0.3..0.3); // ±30%
        Duration::from_millis((base.as_millis() as f64 * jitter_factor) as u64)
    } else {
        base
    }
}
