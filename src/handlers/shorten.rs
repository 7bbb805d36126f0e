use crate::{
    error::{AppError, ShortenError},
    models::{ShortenRequest, ShortenResponse},
    AppState,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// POST /
///
/// The whole body is the URL. Replies `201 Created` with the short link as
/// plain text.
pub async fn shorten_text(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Response, AppError> {
    let link = state.shortener.shorten(&body).await?;
    Ok((StatusCode::CREATED, link).into_response())
}

/// POST /api/shorten
///
/// Body `{"url": "..."}`, reply `201 Created` with `{"result": "<link>"}`.
/// The body is decoded whatever the request's Content-Type says.
pub async fn shorten_json(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: ShortenRequest = serde_json::from_slice(&body)
        .map_err(|e| ShortenError::InvalidRequest(e.to_string()))?;

    let result = state.shortener.shorten(&request.url).await?;
    Ok((StatusCode::CREATED, Json(ShortenResponse { result })).into_response())
}
