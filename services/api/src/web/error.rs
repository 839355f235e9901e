//! services/api/src/web/error.rs
//!
//! The error type returned by every handler. Each variant maps to one status
//! code and a JSON body of the form `{"error": "...", "details": [...]}`.

use attendance_core::ports::PortError;
use attendance_core::schedule_parser::ScheduleParseError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Unavailable(String),

    /// The detail is logged, never sent to the client.
    #[error("Internal server error")]
    Internal(String),
}

impl HttpError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        HttpError::Validation(vec![detail.into()])
    }

    fn status(&self) -> StatusCode {
        match self {
            HttpError::Validation(_) => StatusCode::BAD_REQUEST,
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::Conflict(_) => StatusCode::CONFLICT,
            HttpError::Unauthorized => StatusCode::UNAUTHORIZED,
            HttpError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            HttpError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            HttpError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HttpError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PortError> for HttpError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(msg) => HttpError::NotFound(msg),
            PortError::Conflict(msg) => HttpError::Conflict(msg),
            PortError::Invalid(msg) => HttpError::Validation(vec![msg]),
            PortError::Unavailable(msg) => HttpError::Unavailable(msg),
            PortError::Unauthorized => HttpError::Unauthorized,
            PortError::Unexpected(msg) => HttpError::Internal(msg),
        }
    }
}

impl From<ScheduleParseError> for HttpError {
    fn from(e: ScheduleParseError) -> Self {
        match e {
            ScheduleParseError::FileNotFound(_) => HttpError::NotFound(e.to_string()),
            ScheduleParseError::NoExtractableText | ScheduleParseError::ParsingFailed(_) => {
                HttpError::Unprocessable(e.to_string())
            }
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            HttpError::Validation(details) => json!({ "error": self.to_string(), "details": details }),
            HttpError::Internal(detail) => {
                error!("Request failed: {}", detail);
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_keep_their_distinction() {
        let missing: HttpError = ScheduleParseError::FileNotFound("a.pdf".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let blank: HttpError = ScheduleParseError::NoExtractableText.into();
        assert_eq!(blank.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(blank.to_string().contains("no extractable text"));
    }

    #[test]
    fn port_errors_map_to_statuses() {
        let conflict: HttpError = PortError::Conflict("dup".into()).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        let hidden: HttpError = PortError::Unexpected("db down".into()).into();
        assert_eq!(hidden.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(hidden.to_string(), "Internal server error");
    }
}
