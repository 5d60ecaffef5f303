//! `SeaORM` implementation of the `LeadService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::info;

use crate::api::types::LeadDto;
use crate::config::AssignmentConfig;
use crate::db::{LeadPatch, NewLeadRow, Store};
use crate::domain::events::CrmEvent;
use crate::domain::{LeadId, UserId};
use crate::entities::leads::{self, Estado};
use crate::pipeline;
use crate::services::AssignmentService;
use crate::services::lead_service::{LeadError, LeadPatchInput, LeadService, NewLead};

pub struct SeaOrmLeadService {
    store: Store,
    assignments: Arc<dyn AssignmentService>,
    assignment_config: AssignmentConfig,
    event_bus: broadcast::Sender<CrmEvent>,
}

impl SeaOrmLeadService {
    #[must_use]
    pub fn new(
        store: Store,
        assignments: Arc<dyn AssignmentService>,
        assignment_config: AssignmentConfig,
        event_bus: broadcast::Sender<CrmEvent>,
    ) -> Self {
        Self {
            store,
            assignments,
            assignment_config,
            event_bus,
        }
    }

    async fn require_lead(&self, id: LeadId) -> Result<leads::Model, LeadError> {
        self.store
            .get_lead(id.value())
            .await?
            .ok_or(LeadError::NotFound(id))
    }

    async fn require_access(
        &self,
        caller: UserId,
        lead: &leads::Model,
    ) -> Result<(), LeadError> {
        let visible = self.assignments.can_access(caller, lead.vendedor).await?;
        if visible {
            Ok(())
        } else {
            Err(LeadError::Permission(format!(
                "lead {} is not visible to user {caller}",
                lead.id
            )))
        }
    }

    fn validate_fecha(fecha: Option<&str>) -> Result<(), LeadError> {
        if let Some(raw) = fecha {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                LeadError::Validation(format!("fecha '{raw}' is not an ISO date (YYYY-MM-DD)"))
            })?;
        }
        Ok(())
    }

    async fn validate_vendedor_ref(&self, vendedor: i32) -> Result<(), LeadError> {
        let Some(user) = self.store.get_user(vendedor).await? else {
            return Err(LeadError::Validation(format!(
                "vendedor references unknown user {vendedor}"
            )));
        };
        if !user.active {
            return Err(LeadError::Validation(format!(
                "vendedor {vendedor} is inactive"
            )));
        }
        if !user.role.can_own_leads() {
            return Err(LeadError::Validation(format!(
                "user {vendedor} has role {} and cannot own leads",
                user.role
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LeadService for SeaOrmLeadService {
    async fn create_lead(
        &self,
        input: NewLead,
        requested_by: UserId,
    ) -> Result<LeadDto, LeadError> {
        if input.nombre.trim().is_empty() {
            return Err(LeadError::Validation("nombre is required".to_string()));
        }
        if input.telefono.trim().is_empty() {
            return Err(LeadError::Validation("telefono is required".to_string()));
        }
        if input.modelo.trim().is_empty() {
            return Err(LeadError::Validation("modelo is required".to_string()));
        }
        Self::validate_fecha(input.fecha.as_deref())?;

        if let Some(vendedor) = input.vendedor {
            self.validate_vendedor_ref(vendedor).await?;
        }

        let lead = self
            .store
            .insert_lead(NewLeadRow {
                nombre: input.nombre,
                telefono: input.telefono,
                modelo: input.modelo,
                forma_pago: input.forma_pago,
                info_usado: input.info_usado,
                entrega: input.entrega,
                fecha: input.fecha,
                vendedor: input.vendedor,
                notas: input.notas,
                fuente: input.fuente,
            })
            .await?;

        metrics::counter!("plomo_leads_created_total").increment(1);
        info!("Created lead {} ({}, {})", lead.id, lead.nombre, lead.modelo);
        let _ = self.event_bus.send(CrmEvent::LeadCreated { lead_id: lead.id });

        if let Some(vendedor) = lead.vendedor {
            // Pre-assignment still goes on the audit trail.
            self.store
                .append_assignment(lead.id, None, vendedor, requested_by.value())
                .await?;
            return Ok(lead.into());
        }

        if self.assignment_config.auto_assign
            && let Some(manager) = input.auto_assign_under
        {
            let assigned = self
                .assignments
                .auto_assign(LeadId::new(lead.id), UserId::new(manager), requested_by)
                .await?;
            if let Some(dto) = assigned {
                return Ok(dto);
            }
        }

        Ok(lead.into())
    }

    async fn get_lead(&self, id: LeadId, requested_by: UserId) -> Result<LeadDto, LeadError> {
        let lead = self.require_lead(id).await?;
        self.require_access(requested_by, &lead).await?;
        Ok(lead.into())
    }

    async fn update_lead(
        &self,
        id: LeadId,
        patch: LeadPatchInput,
        requested_by: UserId,
    ) -> Result<LeadDto, LeadError> {
        let lead = self.require_lead(id).await?;
        self.require_access(requested_by, &lead).await?;

        if let Some(nombre) = &patch.nombre
            && nombre.trim().is_empty()
        {
            return Err(LeadError::Validation("nombre cannot be empty".to_string()));
        }
        if let Some(Some(fecha)) = &patch.fecha {
            Self::validate_fecha(Some(fecha))?;
        }

        let updated = self
            .store
            .update_lead_fields(
                lead.id,
                LeadPatch {
                    nombre: patch.nombre,
                    telefono: patch.telefono,
                    modelo: patch.modelo,
                    forma_pago: patch.forma_pago,
                    info_usado: patch.info_usado,
                    entrega: patch.entrega,
                    fecha: patch.fecha,
                    notas: patch.notas,
                    fuente: patch.fuente,
                },
            )
            .await?
            .ok_or(LeadError::NotFound(id))?;

        Ok(updated.into())
    }

    async fn delete_lead(&self, id: LeadId, requested_by: UserId) -> Result<(), LeadError> {
        let requester = self
            .store
            .get_user(requested_by.value())
            .await?
            .ok_or_else(|| LeadError::Permission("unknown caller".to_string()))?;

        if !requester.role.is_admin() {
            return Err(LeadError::Permission(
                "only an admin may delete leads".to_string(),
            ));
        }

        if !self.store.delete_lead(id.value()).await? {
            return Err(LeadError::NotFound(id));
        }

        info!("Deleted lead {}", id);
        let _ = self.event_bus.send(CrmEvent::LeadDeleted { lead_id: id.value() });

        Ok(())
    }

    async fn transition(
        &self,
        id: LeadId,
        from_expected: Estado,
        to: Estado,
        requested_by: UserId,
    ) -> Result<LeadDto, LeadError> {
        let lead = self.require_lead(id).await?;
        self.require_access(requested_by, &lead).await?;

        if !pipeline::is_allowed(from_expected, to) {
            return Err(LeadError::InvalidTransition {
                from: from_expected,
                to,
            });
        }

        if to == Estado::Presupuestado
            && self.store.active_quote_for_lead(lead.id).await?.is_none()
        {
            return Err(LeadError::Precondition(format!(
                "lead {} has no active presupuesto",
                lead.id
            )));
        }

        if to.is_terminal() && lead.vendedor.is_none() {
            return Err(LeadError::Precondition(format!(
                "lead {} is unassigned and cannot be closed",
                lead.id
            )));
        }

        let swapped = self
            .store
            .transition_lead_guarded(
                lead.id,
                from_expected,
                to,
                pipeline::reopens_cycle(from_expected, to),
            )
            .await?;
        if !swapped {
            return Err(LeadError::Conflict(format!(
                "lead {} estado is no longer {from_expected}",
                lead.id
            )));
        }

        metrics::counter!("plomo_lead_transitions_total", "to" => to.to_string()).increment(1);
        info!("Lead {} moved {} -> {}", lead.id, from_expected, to);
        let _ = self.event_bus.send(CrmEvent::LeadTransitioned {
            lead_id: lead.id,
            from: from_expected,
            to,
        });

        let updated = self.require_lead(id).await?;
        Ok(updated.into())
    }
}
