//! Panel error type mapping to HTTP status codes and a JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::core::persona::PersonaError;
use crate::core::session::TurnError;
use crate::core::transcript::SaveError;

#[derive(Debug)]
pub enum PanelError {
    /// Merging the selected personas failed.
    Persona(PersonaError),
    /// A turn produced no reply.
    Turn(TurnError),
    /// Writing the transcript failed.
    Save(SaveError),
    /// No session with this id exists.
    UnknownSession(Uuid),
    /// Another request is working on this session.
    SessionBusy(Uuid),
    /// The request itself is unusable.
    Validation(String),
    Internal(String),
}

impl From<PersonaError> for PanelError {
    fn from(e: PersonaError) -> Self {
        PanelError::Persona(e)
    }
}

impl From<TurnError> for PanelError {
    fn from(e: TurnError) -> Self {
        PanelError::Turn(e)
    }
}

impl From<SaveError> for PanelError {
    fn from(e: SaveError) -> Self {
        PanelError::Save(e)
    }
}

impl PanelError {
    pub fn status(&self) -> StatusCode {
        match self {
            PanelError::Persona(PersonaError::NotFound { .. }) => StatusCode::NOT_FOUND,
            PanelError::Persona(PersonaError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            PanelError::Persona(PersonaError::Read { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            PanelError::Turn(TurnError::TurnFailed(_)) => StatusCode::BAD_GATEWAY,
            PanelError::Turn(TurnError::SessionEnded) => StatusCode::CONFLICT,
            PanelError::Save(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PanelError::UnknownSession(_) => StatusCode::NOT_FOUND,
            PanelError::SessionBusy(_) => StatusCode::CONFLICT,
            PanelError::Validation(_) => StatusCode::BAD_REQUEST,
            PanelError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PanelError::Persona(PersonaError::NotFound { .. }) => "PERSONA_NOT_FOUND",
            PanelError::Persona(PersonaError::InvalidId(_)) => "VALIDATION_ERROR",
            PanelError::Persona(PersonaError::Read { .. }) => "PERSONA_ERROR",
            PanelError::Turn(TurnError::TurnFailed(_)) => "TURN_FAILED",
            PanelError::Turn(TurnError::SessionEnded) => "SESSION_ENDED",
            PanelError::Save(_) => "SAVE_FAILED",
            PanelError::UnknownSession(_) => "SESSION_NOT_FOUND",
            PanelError::SessionBusy(_) => "SESSION_BUSY",
            PanelError::Validation(_) => "VALIDATION_ERROR",
            PanelError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn message(&self) -> String {
        match self {
            PanelError::Persona(e) => e.to_string(),
            PanelError::Turn(e) => e.to_string(),
            PanelError::Save(e) => format!("Save failed: {e}"),
            PanelError::UnknownSession(_) => {
                "Session not found; start a new session first".to_string()
            }
            PanelError::SessionBusy(_) => {
                "This session is still answering a previous request".to_string()
            }
            PanelError::Validation(msg) | PanelError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self.message(), "panel request failed");
        }

        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.message(),
            }
        });
        (status, Json(body)).into_response()
    }
}
