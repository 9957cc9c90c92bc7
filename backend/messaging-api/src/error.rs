use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use event_log::LogError;
use message_search::SearchError;
use message_store::StoreError;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("failed to enqueue message: {0}")]
    Publish(#[from] LogError),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    /// Short machine-readable error kind used in response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => "internal",
            AppError::BadRequest(_) | AppError::Validation(_) => "bad_request",
            AppError::Store(_) => "store_error",
            AppError::Search(_) => "search_error",
            AppError::Publish(_) | AppError::ServiceUnavailable(_) => "service_unavailable",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Publish(_) | AppError::ServiceUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Store(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Search(SearchError::Transport(_) | SearchError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        HttpResponse::build(status).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
            "status": status.as_u16(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Publish(LogError::Closed).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Store(StoreError::InvalidQuery("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_error_body_shape() {
        let response = AppError::BadRequest("missing q".into()).error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "bad_request");
        assert_eq!(value["status"], 400);
        assert_eq!(value["message"], "bad request: missing q");
    }
}
