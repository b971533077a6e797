use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lectern_collab::{DatabaseError, LiveClassError, MediaError};
use serde_json::json;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{field} is required")]
    Validation { field: &'static str },
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("Only the instructor can {action} the class")]
    Forbidden { action: &'static str },
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("Cannot {action} a class that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: String,
    },
    #[error("Class ended, but archiving its recording failed")]
    Archival,
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::Archival => StatusCode::BAD_GATEWAY,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "message": self.to_string(),
            "errors": [],
        });

        (self.as_status_code(), Json(body)).into_response()
    }
}

impl From<LiveClassError> for ServerError {
    fn from(value: LiveClassError) -> Self {
        match value {
            LiveClassError::Validation { field } => Self::Validation { field },
            LiveClassError::Forbidden { action } => Self::Forbidden { action },
            LiveClassError::InvalidTransition { action, status } => Self::InvalidTransition {
                action,
                status: status.to_string(),
            },
            LiveClassError::Archival(_) => Self::Archival,
            LiveClassError::Database(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<MediaError> for ServerError {
    fn from(value: MediaError) -> Self {
        Self::Unknown(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use lectern_collab::LiveClassStatus;

    use super::*;

    #[test]
    fn errors_map_to_the_expected_status_codes() {
        let cases = [
            (
                ServerError::Validation { field: "title" },
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::Unauthorized("Missing authorization"),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ServerError::Forbidden { action: "start" },
                StatusCode::FORBIDDEN,
            ),
            (
                ServerError::NotFound {
                    resource: "live class",
                    identifier: "id",
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::InvalidTransition {
                    action: "end",
                    status: "COMPLETED".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (ServerError::Archival, StatusCode::BAD_GATEWAY),
            (
                ServerError::Unknown("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.as_status_code(), expected);
        }
    }

    #[test]
    fn transition_errors_carry_the_current_status() {
        let error: ServerError = LiveClassError::InvalidTransition {
            action: "end",
            status: LiveClassStatus::Completed,
        }
        .into();

        assert_eq!(error.to_string(), "Cannot end a class that is COMPLETED");
    }
}
