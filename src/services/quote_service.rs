//! Domain service for presupuesto (price-quote) linkage.
//!
//! A lead carries at most one active quote; attaching a new one supersedes
//! the previous one without deleting it.

use serde::Deserialize;
use thiserror::Error;

use crate::api::types::QuoteDto;
use crate::db;
use crate::domain::{LeadId, QuoteId};

/// Errors specific to quote operations.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Presupuesto not found: {0}")]
    QuoteNotFound(QuoteId),

    #[error("Lead not found: {0}")]
    LeadNotFound(LeadId),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for QuoteError {
    fn from(err: sea_orm::DbErr) -> Self {
        if db::is_unavailable(&err) {
            Self::Unavailable(err.to_string())
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<anyhow::Error> for QuoteError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<sea_orm::DbErr>() {
            Some(db_err) if db::is_unavailable(db_err) => Self::Unavailable(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<crate::services::AssignmentError> for QuoteError {
    fn from(err: crate::services::AssignmentError) -> Self {
        use crate::services::AssignmentError;
        match err {
            AssignmentError::LeadNotFound(id) => Self::LeadNotFound(id),
            AssignmentError::UserNotFound(id) => Self::Validation(format!("user {id} not found")),
            AssignmentError::Validation(msg) => Self::Validation(msg),
            AssignmentError::Permission(msg) => Self::Permission(msg),
            AssignmentError::Conflict(msg) => Self::Validation(msg),
            AssignmentError::Unavailable(msg) => Self::Unavailable(msg),
            AssignmentError::Database(msg) => Self::Database(msg),
        }
    }
}

/// Input for a new presupuesto. The body is opaque to the core.
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuote {
    pub contenido: serde_json::Value,
    #[serde(default)]
    pub lead_id: Option<i32>,
}

/// Domain service trait for quote linkage.
#[async_trait::async_trait]
pub trait QuoteService: Send + Sync {
    /// Stores a new quote template. When `lead_id` is given the quote is
    /// attached immediately, superseding any active one.
    async fn create_quote(
        &self,
        input: NewQuote,
        requested_by: crate::domain::UserId,
    ) -> Result<QuoteDto, QuoteError>;

    async fn get_quote(&self, id: QuoteId) -> Result<QuoteDto, QuoteError>;

    /// Makes `quote_id` the lead's single active quote. The supersession of
    /// the prior active quote and the activation commit together.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError::LeadNotFound`] / [`QuoteError::QuoteNotFound`]
    /// when either id is unknown.
    async fn attach(
        &self,
        lead_id: LeadId,
        quote_id: QuoteId,
        requested_by: crate::domain::UserId,
    ) -> Result<QuoteDto, QuoteError>;

    /// Deactivates the lead's current active quote without deleting it.
    /// A lead with no active quote detaches as a no-op.
    async fn detach(
        &self,
        lead_id: LeadId,
        requested_by: crate::domain::UserId,
    ) -> Result<(), QuoteError>;

    async fn active_for_lead(&self, lead_id: LeadId) -> Result<Option<QuoteDto>, QuoteError>;

    async fn list_for_lead(&self, lead_id: LeadId) -> Result<Vec<QuoteDto>, QuoteError>;
}
