use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum WebError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large: {0}")]
    TooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<axum::extract::multipart::MultipartError> for WebError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            WebError::TooLarge(e.body_text())
        } else {
            WebError::BadRequest(format!("malformed upload: {}", e.body_text()))
        }
    }
}

impl From<bt_core::Error> for WebError {
    fn from(e: bt_core::Error) -> Self {
        match e {
            bt_core::Error::Session(message) => WebError::NotFound(message),
            other => WebError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!("{} {}", status.as_u16(), self);
        (status, self.to_string()).into_response()
    }
}
