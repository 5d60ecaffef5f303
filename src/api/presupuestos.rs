use axum::{
    Json,
    extract::{Extension, Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::identity::Caller;
use super::{ApiError, ApiResponse, AppState, QuoteDto};
use crate::domain::{LeadId, QuoteId};
use crate::services::NewQuote;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct AttachQuoteRequest {
    pub presupuesto_id: i32,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/presupuestos
pub async fn create_quote(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<NewQuote>,
) -> Result<Json<ApiResponse<QuoteDto>>, ApiError> {
    let quote = state.quotes().create_quote(payload, caller.id).await?;
    Ok(Json(ApiResponse::success(quote)))
}

/// GET /api/presupuestos/{id}
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<QuoteDto>>, ApiError> {
    let quote = state.quotes().get_quote(QuoteId::new(id)).await?;
    Ok(Json(ApiResponse::success(quote)))
}

/// POST /api/leads/{id}/presupuesto
pub async fn attach_quote(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<AttachQuoteRequest>,
) -> Result<Json<ApiResponse<QuoteDto>>, ApiError> {
    let quote = state
        .quotes()
        .attach(
            LeadId::new(id),
            QuoteId::new(payload.presupuesto_id),
            caller.id,
        )
        .await?;

    Ok(Json(ApiResponse::success(quote)))
}

/// DELETE /api/leads/{id}/presupuesto
pub async fn detach_quote(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.quotes().detach(LeadId::new(id), caller.id).await?;
    Ok(Json(ApiResponse::success(())))
}

/// GET /api/leads/{id}/presupuestos
pub async fn list_quotes_for_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<QuoteDto>>>, ApiError> {
    let quotes = state.quotes().list_for_lead(LeadId::new(id)).await?;
    Ok(Json(ApiResponse::success(quotes)))
}
