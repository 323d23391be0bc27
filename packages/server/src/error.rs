//! Application-level error type returned by handlers.
//!
//! All variants serialise to the [`ErrorResponse`] JSON envelope and map to
//! the appropriate HTTP status code. Validation failures carry the full
//! aggregated violation list in `details`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use terrograph::patch::PatchError;
use terrograph::validation::ConstraintViolations;
use terrograph_api::error::{codes, ErrorResponse};

use crate::storage::StorageError;

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    InvalidJson(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
    UnsupportedMediaType(String),
    Validation(ConstraintViolations),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new(codes::NOT_FOUND, msg),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(codes::INVALID_PARAMETER, msg),
            ),
            AppError::InvalidJson(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(codes::INVALID_JSON, msg),
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::new(codes::ID_CONFLICT, msg),
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new(codes::UNAUTHORIZED, msg),
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new(codes::FORBIDDEN, msg),
            ),
            AppError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ErrorResponse::new(codes::UNSUPPORTED_MEDIA_TYPE, msg),
            ),
            AppError::Validation(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::validation(violations.to_string(), violations.messages()),
            ),
            AppError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(codes::INTERNAL_ERROR, msg),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => AppError::NotFound("not found".into()),
            StorageError::Conflict(msg) => AppError::Conflict(msg),
            StorageError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ConstraintViolations> for AppError {
    fn from(v: ConstraintViolations) -> Self {
        AppError::Validation(v)
    }
}

impl From<PatchError> for AppError {
    fn from(e: PatchError) -> Self {
        match e {
            PatchError::Serialize(msg) => AppError::Internal(msg),
            PatchError::Apply(msg) => AppError::BadRequest(msg),
            PatchError::Reshape(msg) => AppError::BadRequest(msg),
        }
    }
}
