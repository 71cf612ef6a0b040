use crate::models::{ChallengeId, HabitId, UserId};
use axum::{http::StatusCode, Json};
use serde_json::json;

/// Failures raised by the persistence port.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("habit {0} not found")]
    HabitNotFound(HabitId),
    #[error("challenge {0} not found")]
    ChallengeNotFound(ChallengeId),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("forbidden")]
    Forbidden,
    #[error("username {0:?} is already taken")]
    UsernameTaken(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::HabitNotFound(_)
            | StoreError::ChallengeNotFound(_)
            | StoreError::UserNotFound(_) => Self::not_found(message),
            StoreError::Forbidden => Self::forbidden(message),
            StoreError::UsernameTaken(_) => Self::conflict(message),
            StoreError::Invalid(_) => Self::bad_request(message),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
