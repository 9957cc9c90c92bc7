pub mod conversations;
pub mod health;
pub mod messages;

use crate::error::AppError;
use actix_web::web;

/// Register every endpoint, with extractor failures reported as 400 in the
/// same error shape as the handlers use.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(messages::create_message)
    .service(conversations::get_conversation_messages)
    .service(conversations::search_conversation_messages)
    .service(health::health)
    .service(crate::metrics::metrics_handler);
}
