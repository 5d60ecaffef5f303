use axum::{
    Json,
    extract::{Extension, Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::identity::Caller;
use super::types::double_option;
use super::{ApiError, ApiResponse, AppState, AssignmentDto, LeadDto};
use crate::domain::{LeadId, UserId};
use crate::entities::leads::Estado;
use crate::services::{LeadPatchInput, NewLead};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct UpdateLeadRequest {
    pub nombre: Option<String>,
    pub telefono: Option<String>,
    pub modelo: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub forma_pago: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub info_usado: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub entrega: Option<Option<bool>>,
    #[serde(default, deserialize_with = "double_option")]
    pub fecha: Option<Option<String>>,
    pub notas: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub fuente: Option<Option<String>>,
}

#[derive(Deserialize)]
pub struct AssignLeadRequest {
    pub target_user_id: i32,
}

#[derive(Deserialize)]
pub struct TransitionLeadRequest {
    pub from: Estado,
    pub to: Estado,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/leads
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<NewLead>,
) -> Result<Json<ApiResponse<LeadDto>>, ApiError> {
    let lead = state.leads().create_lead(payload, caller.id).await?;
    Ok(Json(ApiResponse::success(lead)))
}

/// GET /api/leads
///
/// Returns exactly the leads visible to the caller under the hierarchy
/// policy: own leads for a vendedor, the subtree for a manager, everything
/// for an admin.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<LeadDto>>>, ApiError> {
    let leads = state.assignments().visible_leads_for(caller.id).await?;
    Ok(Json(ApiResponse::success(leads)))
}

/// GET /api/leads/{id}
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<LeadDto>>, ApiError> {
    let lead = state.leads().get_lead(LeadId::new(id), caller.id).await?;
    Ok(Json(ApiResponse::success(lead)))
}

/// PUT /api/leads/{id}
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateLeadRequest>,
) -> Result<Json<ApiResponse<LeadDto>>, ApiError> {
    let patch = LeadPatchInput {
        nombre: payload.nombre,
        telefono: payload.telefono,
        modelo: payload.modelo,
        forma_pago: payload.forma_pago,
        info_usado: payload.info_usado,
        entrega: payload.entrega,
        fecha: payload.fecha,
        notas: payload.notas,
        fuente: payload.fuente,
    };

    let lead = state
        .leads()
        .update_lead(LeadId::new(id), patch, caller.id)
        .await?;

    Ok(Json(ApiResponse::success(lead)))
}

/// DELETE /api/leads/{id}
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.leads().delete_lead(LeadId::new(id), caller.id).await?;
    Ok(Json(ApiResponse::success(())))
}

/// POST /api/leads/{id}/assign
pub async fn assign_lead(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<AssignLeadRequest>,
) -> Result<Json<ApiResponse<LeadDto>>, ApiError> {
    let lead = state
        .assignments()
        .assign(
            LeadId::new(id),
            UserId::new(payload.target_user_id),
            caller.id,
        )
        .await?;

    Ok(Json(ApiResponse::success(lead)))
}

/// POST /api/leads/{id}/transition
pub async fn transition_lead(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
    Json(payload): Json<TransitionLeadRequest>,
) -> Result<Json<ApiResponse<LeadDto>>, ApiError> {
    let lead = state
        .leads()
        .transition(LeadId::new(id), payload.from, payload.to, caller.id)
        .await?;

    Ok(Json(ApiResponse::success(lead)))
}

/// GET /api/leads/{id}/assignments
pub async fn assignment_history(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<AssignmentDto>>>, ApiError> {
    let history = state
        .assignments()
        .history(LeadId::new(id), caller.id)
        .await?;

    Ok(Json(ApiResponse::success(history)))
}
