//! Caller identity resolution.
//!
//! Authentication is an external collaborator: the gateway in front of this
//! service verifies credentials and forwards the principal's user id in the
//! `X-Caller-Id` header. This middleware resolves that id against the
//! directory on every request and injects a typed [`Caller`] extension; no
//! session state lives in the process.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::domain::UserId;
use crate::entities::users::Role;

pub const CALLER_HEADER: &str = "X-Caller-Id";

/// The authenticated principal, resolved from the directory per request.
#[derive(Clone, Copy, Debug)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

pub async fn identity_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(raw) = headers.get(CALLER_HEADER).and_then(|v| v.to_str().ok()) else {
        return Err(ApiError::Unauthorized(format!(
            "missing {CALLER_HEADER} header"
        )));
    };

    let id: i32 = raw.trim().parse().map_err(|_| {
        ApiError::Unauthorized(format!("{CALLER_HEADER} must be a numeric user id"))
    })?;

    let user = state
        .store()
        .get_user(id)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to resolve caller: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("unknown caller".to_string()))?;

    if !user.active {
        return Err(ApiError::Unauthorized("caller is deactivated".to_string()));
    }

    tracing::Span::current().record("user_id", user.id);

    request.extensions_mut().insert(Caller {
        id: UserId::new(user.id),
        role: user.role,
    });

    Ok(next.run(request).await.into_response())
}
