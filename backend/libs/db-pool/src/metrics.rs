//! Prometheus metrics for the message store connection pool

use prometheus::{register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGaugeVec};
use sqlx::PgPool;

lazy_static::lazy_static! {
    /// Pool connections by state (idle/active/max)
    static ref DB_POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "db_pool_connections",
        "Database pool connection count by state",
        &["service", "state"]
    ).expect("Prometheus metrics registration should succeed at startup");

    /// Pool creation attempts, labelled ok/error/timeout
    static ref DB_CONNECT_ATTEMPTS: IntCounterVec = register_int_counter_vec!(
        "db_pool_connect_attempts_total",
        "Database pool creation attempts by outcome",
        &["service", "outcome"]
    ).expect("Prometheus metrics registration should succeed at startup");
}

pub(crate) fn record_connect_attempt(service: &str, outcome: &str) {
    DB_CONNECT_ATTEMPTS
        .with_label_values(&[service, outcome])
        .inc();
}

pub(crate) fn update_pool_metrics(pool: &PgPool, service: &str) {
    let size = pool.size() as i64;
    let idle = pool.num_idle() as i64;

    for (state, value) in [
        ("idle", idle),
        ("active", size - idle),
        ("max", pool.options().get_max_connections() as i64),
    ] {
        DB_POOL_CONNECTIONS
            .with_label_values(&[service, state])
            .set(value);
    }
}
