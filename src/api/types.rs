use serde::{Deserialize, Serialize};

use crate::entities::leads::Estado;
use crate::entities::users::Role;
use crate::entities::{assignment_log, leads, presupuestos, users};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Deserializer for patch fields where an omitted key means "no change"
/// and an explicit `null` means "clear the value".
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub reports_to: Option<i32>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for UserDto {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            reports_to: model.reports_to,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadDto {
    pub id: i32,
    pub nombre: String,
    pub telefono: String,
    pub modelo: String,
    pub forma_pago: Option<String>,
    pub info_usado: Option<String>,
    pub entrega: Option<bool>,
    pub fecha: Option<String>,
    pub estado: Estado,
    pub vendedor: Option<i32>,
    pub notas: String,
    pub fuente: Option<String>,
    pub ciclo: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<leads::Model> for LeadDto {
    fn from(model: leads::Model) -> Self {
        Self {
            id: model.id,
            nombre: model.nombre,
            telefono: model.telefono,
            modelo: model.modelo,
            forma_pago: model.forma_pago,
            info_usado: model.info_usado,
            entrega: model.entrega,
            fecha: model.fecha,
            estado: model.estado,
            vendedor: model.vendedor,
            notas: model.notas,
            fuente: model.fuente,
            ciclo: model.ciclo,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteDto {
    pub id: i32,
    pub lead_id: Option<i32>,
    pub contenido: serde_json::Value,
    pub activo: bool,
    pub created_at: String,
}

impl From<presupuestos::Model> for QuoteDto {
    fn from(model: presupuestos::Model) -> Self {
        let contenido = serde_json::from_str(&model.contenido)
            .unwrap_or(serde_json::Value::String(model.contenido));

        Self {
            id: model.id,
            lead_id: model.lead_id,
            contenido,
            activo: model.activo,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentDto {
    pub id: i32,
    pub lead_id: i32,
    pub from_vendedor: Option<i32>,
    pub to_vendedor: i32,
    pub assigned_by: i32,
    pub assigned_at: String,
}

impl From<assignment_log::Model> for AssignmentDto {
    fn from(model: assignment_log::Model) -> Self {
        Self {
            id: model.id,
            lead_id: model.lead_id,
            from_vendedor: model.from_vendedor,
            to_vendedor: model.to_vendedor,
            assigned_by: model.assigned_by,
            assigned_at: model.assigned_at,
        }
    }
}
