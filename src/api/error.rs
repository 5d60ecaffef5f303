use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{AssignmentError, LeadError, QuoteError, UserError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    ValidationError(String),

    PermissionError(String),

    PreconditionError(String),

    InvalidTransition(String),

    Conflict(String),

    Unavailable(String),

    DatabaseError(String),

    InternalError(String),

    Unauthorized(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::PermissionError(msg) => write!(f, "Permission error: {msg}"),
            Self::PreconditionError(msg) => write!(f, "Precondition error: {msg}"),
            Self::InvalidTransition(msg) => write!(f, "Invalid transition: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::Unavailable(msg) => write!(f, "Unavailable: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::PermissionError(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::PreconditionError(msg) => (StatusCode::PRECONDITION_FAILED, msg.clone()),
            Self::InvalidTransition(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Unavailable(msg) => {
                tracing::warn!("Store unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The store is temporarily unavailable, retry later".to_string(),
                )
            }
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => Self::NotFound(format!("User {id} not found")),
            UserError::Validation(msg) => Self::ValidationError(msg),
            UserError::Permission(msg) => Self::PermissionError(msg),
            UserError::Conflict(msg) => Self::Conflict(msg),
            UserError::Unavailable(msg) => Self::Unavailable(msg),
            UserError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

impl From<LeadError> for ApiError {
    fn from(err: LeadError) -> Self {
        match err {
            LeadError::NotFound(id) => Self::NotFound(format!("Lead {id} not found")),
            LeadError::Validation(msg) => Self::ValidationError(msg),
            LeadError::Permission(msg) => Self::PermissionError(msg),
            LeadError::Precondition(msg) => Self::PreconditionError(msg),
            LeadError::InvalidTransition { from, to } => {
                Self::InvalidTransition(format!("{from} -> {to} is not a legal pipeline move"))
            }
            LeadError::Conflict(msg) => Self::Conflict(msg),
            LeadError::Unavailable(msg) => Self::Unavailable(msg),
            LeadError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

impl From<AssignmentError> for ApiError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::LeadNotFound(id) => Self::NotFound(format!("Lead {id} not found")),
            AssignmentError::UserNotFound(id) => Self::NotFound(format!("User {id} not found")),
            AssignmentError::Validation(msg) => Self::ValidationError(msg),
            AssignmentError::Permission(msg) => Self::PermissionError(msg),
            AssignmentError::Conflict(msg) => Self::Conflict(msg),
            AssignmentError::Unavailable(msg) => Self::Unavailable(msg),
            AssignmentError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::QuoteNotFound(id) => {
                Self::NotFound(format!("Presupuesto {id} not found"))
            }
            QuoteError::LeadNotFound(id) => Self::NotFound(format!("Lead {id} not found")),
            QuoteError::Permission(msg) => Self::PermissionError(msg),
            QuoteError::Validation(msg) => Self::ValidationError(msg),
            QuoteError::Unavailable(msg) => Self::Unavailable(msg),
            QuoteError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}
