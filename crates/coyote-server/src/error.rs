use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coyote_core::error::ShockError;

// ---------------------------------------------------------------------------
// AppError error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(ShockError::Validation(msg.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<ShockError>() {
            match e {
                ShockError::Validation(_)
                | ShockError::InvalidPulse(_)
                | ShockError::PulseTooLong(_) => StatusCode::BAD_REQUEST,
                ShockError::NotReady
                | ShockError::BindingTimeout(_)
                | ShockError::SequencerStopped => StatusCode::SERVICE_UNAVAILABLE,
                ShockError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
