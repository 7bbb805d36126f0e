use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures of the durable log and the backends built on it.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Only produced when replaying in strict mode.
    #[error("corrupt log record at line {line}: {source}")]
    CorruptLog {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage has been closed")]
    Closed,
}

/// Errors surfaced by the shortening service to its callers.
#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("id: '{0}' not found")]
    NotFound(String),

    #[error("malformed request: {0}")]
    InvalidRequest(String),

    /// The stored target of this key cannot be sent as a Location header.
    #[error("stored url for '{0}' cannot be used as a redirect target")]
    UnredirectableUrl(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// HTTP face of [`ShortenError`].
pub struct AppError(pub ShortenError);

impl From<ShortenError> for AppError {
    fn from(err: ShortenError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self.0 {
            ShortenError::Storage(e) => {
                tracing::error!("storage failure while handling request: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
            e @ ShortenError::UnredirectableUrl(_) => {
                tracing::error!("{}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
            // Existing clients expect 400 for every client-side failure,
            // unknown ids included.
            client_error => (
                StatusCode::BAD_REQUEST,
                format!("Bad Request! {client_error}"),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: ShortenError) -> StatusCode {
        AppError(err).into_response().status()
    }

    #[test]
    fn client_errors_are_bad_request() {
        assert_eq!(status(ShortenError::NotFound("nope".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(ShortenError::InvalidRequest("empty body".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn server_errors_are_internal() {
        assert_eq!(
            status(ShortenError::Storage(StorageError::Closed)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(ShortenError::UnredirectableUrl("k1".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
