//! Domain service for the user directory and reporting hierarchy.
//!
//! Covers creation, updates, soft/hard removal and manager-chain
//! resolution. Structural mutations re-validate the hierarchy against the
//! persisted directory on every call.

use serde::Deserialize;
use thiserror::Error;

use crate::api::types::UserDto;
use crate::db;
use crate::domain::UserId;
use crate::entities::users::Role;

/// Errors specific to directory operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(UserId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        if db::is_unavailable(&err) {
            Self::Unavailable(err.to_string())
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<sea_orm::DbErr>() {
            Some(db_err) if db::is_unavailable(db_err) => Self::Unavailable(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

/// Input for a new directory entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub reports_to: Option<i32>,
}

/// Partial directory update. `reports_to` distinguishes an omitted field
/// (no change) from an explicit null (detach from manager).
#[derive(Debug, Clone, Default)]
pub struct UserPatchInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub reports_to: Option<Option<i32>>,
}

/// Domain service trait for the user directory.
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Creates a directory entry. Admin-only.
    ///
    /// # Errors
    ///
    /// - [`UserError::Permission`] if the caller is not an admin
    /// - [`UserError::Conflict`] on a duplicate email
    /// - [`UserError::Validation`] on a dangling or inactive `reports_to`
    async fn create_user(&self, input: NewUser, requested_by: UserId)
    -> Result<UserDto, UserError>;

    /// Applies a partial update. Allowed for admins and the target's
    /// ancestor managers.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::Validation`] if the new `reports_to` would
    /// introduce a reporting cycle or reference a nonexistent/inactive user.
    async fn update_user(
        &self,
        id: UserId,
        patch: UserPatchInput,
        requested_by: UserId,
    ) -> Result<UserDto, UserError>;

    /// Soft-deletes a user.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::Conflict`] while the user still owns leads in a
    /// non-terminal pipeline state; those must be reassigned first.
    async fn deactivate_user(&self, id: UserId, requested_by: UserId) -> Result<(), UserError>;

    /// Hard-deletes a user. Admin-only, and only when the user owns no
    /// leads at all, so historical assignments stay resolvable.
    async fn delete_user(&self, id: UserId, requested_by: UserId) -> Result<(), UserError>;

    async fn get_user(&self, id: UserId) -> Result<UserDto, UserError>;

    async fn list_users(&self) -> Result<Vec<UserDto>, UserError>;

    /// Ordered ancestors of `id`, from direct manager to root.
    async fn manager_chain(&self, id: UserId) -> Result<Vec<UserDto>, UserError>;
}
