use crate::{
    error::AppError,
    models::{ConversationMessagesQuery, SearchMessagesQuery},
    state::AppState,
};
use actix_web::{get, web, HttpResponse};

/// GET /api/conversations/{conversation_id}/messages
#[get("/api/conversations/{conversation_id}/messages")]
pub async fn get_conversation_messages(
    state: web::Data<AppState>,
    conversation_id: web::Path<String>,
    query: web::Query<ConversationMessagesQuery>,
) -> Result<HttpResponse, AppError> {
    let sort_by = query.sort_by.unwrap_or_default();
    if !sort_by.is_time_based() {
        return Err(AppError::BadRequest(
            "sortBy must be one of time-asc, time-desc".to_string(),
        ));
    }
    let cursor = query.cursor()?;

    let page = state
        .conversations
        .get_messages(&conversation_id, cursor, sort_by)
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/conversations/{conversation_id}/messages/search?q=
#[get("/api/conversations/{conversation_id}/messages/search")]
pub async fn search_conversation_messages(
    state: web::Data<AppState>,
    conversation_id: web::Path<String>,
    query: web::Query<SearchMessagesQuery>,
) -> Result<HttpResponse, AppError> {
    let search_term = query.search_term()?;
    let cursor = query.cursor()?;

    let page = state
        .conversations
        .search_messages(
            &conversation_id,
            search_term,
            cursor,
            query.sort_by.unwrap_or_default(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(page))
}
