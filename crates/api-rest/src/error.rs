use api_shared::ErrorRes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use triage_core::TriageError;

/// An error response: a status code and a message for the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn session_not_found(id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("session '{id}' not found"))
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        let status = match &err {
            TriageError::InvalidOption { .. }
            | TriageError::NothingToUndo
            | TriageError::SessionCompleted
            | TriageError::InvalidInput(_)
            | TriageError::Text(_)
            | TriageError::Range(_) => StatusCode::BAD_REQUEST,
            TriageError::NoSymptoms => StatusCode::UNPROCESSABLE_ENTITY,
            TriageError::AnalysisInFlight | TriageError::StaleAnalysis => StatusCode::CONFLICT,
            TriageError::QuestionNotFound(_) => StatusCode::NOT_FOUND,
            _ => {
                tracing::error!("Unexpected engine error: {:?}", err);
                return Self::internal();
            }
        };
        tracing::debug!(%status, "request rejected: {err}");
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorRes { error: self.message })).into_response()
    }
}
