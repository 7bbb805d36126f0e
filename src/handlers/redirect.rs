use crate::{
    error::{AppError, ShortenError},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use url::Url;

/// GET /:key
///
/// Redirect to the URL stored under `key` with the configured status
/// (307 by default, 308 when permanent redirects are enabled).
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let original_url = state.shortener.resolve(&key)?;

    let location = location_header(&original_url)
        .ok_or_else(|| ShortenError::UnredirectableUrl(key.clone()))?;

    Ok((
        state.config.redirect.status_code(),
        [(header::LOCATION, location)],
    )
        .into_response())
}

/// URLs are stored as submitted, which may include characters a header
/// cannot carry (non-ASCII hosts or paths). Those fall back to the
/// percent-encoded serialization.
fn location_header(url: &str) -> Option<HeaderValue> {
    if url.is_ascii() {
        if let Ok(value) = HeaderValue::from_str(url) {
            return Some(value);
        }
    }
    Url::parse(url)
        .ok()
        .and_then(|parsed| HeaderValue::from_str(parsed.as_str()).ok())
}
