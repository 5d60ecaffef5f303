//! Domain service for lead lifecycle operations.
//!
//! Creation, contact-field updates, deletion and the pipeline transition
//! command. Assignment and visibility decisions are delegated to the
//! assignment engine; the transition edge set lives in [`crate::pipeline`].

use serde::Deserialize;
use thiserror::Error;

use crate::api::types::LeadDto;
use crate::db;
use crate::domain::LeadId;
use crate::entities::leads::Estado;

/// Errors specific to lead operations.
#[derive(Debug, Error)]
pub enum LeadError {
    #[error("Lead not found: {0}")]
    NotFound(LeadId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: Estado, to: Estado },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for LeadError {
    fn from(err: sea_orm::DbErr) -> Self {
        if db::is_unavailable(&err) {
            Self::Unavailable(err.to_string())
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<anyhow::Error> for LeadError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<sea_orm::DbErr>() {
            Some(db_err) if db::is_unavailable(db_err) => Self::Unavailable(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<crate::services::AssignmentError> for LeadError {
    fn from(err: crate::services::AssignmentError) -> Self {
        use crate::services::AssignmentError;
        match err {
            AssignmentError::LeadNotFound(id) => Self::NotFound(id),
            AssignmentError::UserNotFound(id) => Self::Validation(format!("user {id} not found")),
            AssignmentError::Validation(msg) => Self::Validation(msg),
            AssignmentError::Permission(msg) => Self::Permission(msg),
            AssignmentError::Conflict(msg) => Self::Conflict(msg),
            AssignmentError::Unavailable(msg) => Self::Unavailable(msg),
            AssignmentError::Database(msg) => Self::Database(msg),
        }
    }
}

/// Input for a new lead. When `vendedor` is absent and
/// `auto_assign_under` names a manager, the assignment engine may pick an
/// owner automatically (config-gated).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLead {
    pub nombre: String,
    pub telefono: String,
    pub modelo: String,
    #[serde(default)]
    pub forma_pago: Option<String>,
    #[serde(default)]
    pub info_usado: Option<String>,
    #[serde(default)]
    pub entrega: Option<bool>,
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub vendedor: Option<i32>,
    #[serde(default)]
    pub notas: String,
    #[serde(default)]
    pub fuente: Option<String>,
    #[serde(default)]
    pub auto_assign_under: Option<i32>,
}

/// Partial update of the contact/vehicle fields. `estado` and `vendedor`
/// are not patchable; they move through `transition` and `assign` only.
#[derive(Debug, Clone, Default)]
pub struct LeadPatchInput {
    pub nombre: Option<String>,
    pub telefono: Option<String>,
    pub modelo: Option<String>,
    pub forma_pago: Option<Option<String>>,
    pub info_usado: Option<Option<String>>,
    pub entrega: Option<Option<bool>>,
    pub fecha: Option<Option<String>>,
    pub notas: Option<String>,
    pub fuente: Option<Option<String>>,
}

/// Domain service trait for lead lifecycle operations.
#[async_trait::async_trait]
pub trait LeadService: Send + Sync {
    /// Creates a lead in `estado = nuevo`, optionally pre-assigned or
    /// auto-assigned under a manager.
    ///
    /// # Errors
    ///
    /// Returns [`LeadError::Validation`] on empty contact fields, a bad
    /// `fecha`, or a `vendedor` that is unknown, inactive or cannot own
    /// leads.
    async fn create_lead(&self, input: NewLead, requested_by: crate::domain::UserId)
    -> Result<LeadDto, LeadError>;

    /// Fetches a lead, enforcing the caller's visibility.
    async fn get_lead(
        &self,
        id: LeadId,
        requested_by: crate::domain::UserId,
    ) -> Result<LeadDto, LeadError>;

    /// Applies a partial update to the contact/vehicle fields.
    async fn update_lead(
        &self,
        id: LeadId,
        patch: LeadPatchInput,
        requested_by: crate::domain::UserId,
    ) -> Result<LeadDto, LeadError>;

    /// Removes a lead. Admin-only; removal is explicit, never a side
    /// effect.
    async fn delete_lead(
        &self,
        id: LeadId,
        requested_by: crate::domain::UserId,
    ) -> Result<(), LeadError>;

    /// Moves a lead along the pipeline.
    ///
    /// `from_expected` is the caller's view of the current state and acts
    /// as the optimistic-concurrency guard: the write commits only if the
    /// stored `estado` still matches.
    ///
    /// # Errors
    ///
    /// - [`LeadError::InvalidTransition`] if the edge is not in the
    ///   allowed set
    /// - [`LeadError::Precondition`] if `presupuestado` is entered with no
    ///   active quote, or a terminal state with no owner
    /// - [`LeadError::Conflict`] if the stored state no longer matches
    ///   `from_expected`
    async fn transition(
        &self,
        id: LeadId,
        from_expected: Estado,
        to: Estado,
        requested_by: crate::domain::UserId,
    ) -> Result<LeadDto, LeadError>;
}
