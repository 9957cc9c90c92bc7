/// Retry policies shared by the messaging services
///
/// Two shapes are supported:
/// - **Bounded**: exponential backoff with jitter, giving up after `max_retries`
/// - **Unbounded**: a fixed delay between attempts that never gives up, used for
///   store connections where the process must not exit on a transient outage
///
/// # Example: connect with a fixed 5s delay until it succeeds
///
/// ```rust,no_run
/// use resilience::{with_retry, RetryConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let config = RetryConfig::fixed_forever(Duration::from_secs(5));
///
///     let result = with_retry(config, || async {
///         // Your connection attempt here
///         Ok::<_, String>(())
///     }).await;
/// }
/// ```

pub mod retry;

pub use retry::{with_retry, with_retry_when, RetryConfig, RetryError};
