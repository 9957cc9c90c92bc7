use crate::{
    error::AppError,
    models::{CreateMessageRequest, CreateMessageResponse},
    state::AppState,
};
use actix_web::{post, web, HttpResponse};
use validator::Validate;

/// POST /api/messages
/// Accept a message into the log. Storage and indexing happen asynchronously.
#[post("/api/messages")]
pub async fn create_message(
    state: web::Data<AppState>,
    body: web::Json<CreateMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    request.validate()?;

    match state.messages.create_message(request).await {
        Ok(_) => Ok(HttpResponse::Accepted().json(CreateMessageResponse::enqueued())),
        Err(AppError::Publish(e)) => {
            tracing::warn!(error = %e, "Message was not enqueued");
            Ok(HttpResponse::ServiceUnavailable().json(CreateMessageResponse::failed(format!(
                "Message could not be enqueued: {e}"
            ))))
        }
        Err(e) => Err(e),
    }
}
