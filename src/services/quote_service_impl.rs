//! `SeaORM` implementation of the `QuoteService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::info;

use crate::api::types::QuoteDto;
use crate::db::Store;
use crate::domain::events::CrmEvent;
use crate::domain::{LeadId, QuoteId, UserId};
use crate::entities::leads;
use crate::services::AssignmentService;
use crate::services::quote_service::{NewQuote, QuoteError, QuoteService};

pub struct SeaOrmQuoteService {
    store: Store,
    assignments: Arc<dyn AssignmentService>,
    event_bus: broadcast::Sender<CrmEvent>,
}

impl SeaOrmQuoteService {
    #[must_use]
    pub fn new(
        store: Store,
        assignments: Arc<dyn AssignmentService>,
        event_bus: broadcast::Sender<CrmEvent>,
    ) -> Self {
        Self {
            store,
            assignments,
            event_bus,
        }
    }

    async fn require_lead(&self, id: LeadId) -> Result<leads::Model, QuoteError> {
        self.store
            .get_lead(id.value())
            .await?
            .ok_or(QuoteError::LeadNotFound(id))
    }

    async fn require_access(
        &self,
        caller: UserId,
        lead: &leads::Model,
    ) -> Result<(), QuoteError> {
        let visible = self.assignments.can_access(caller, lead.vendedor).await?;
        if visible {
            Ok(())
        } else {
            Err(QuoteError::Permission(format!(
                "lead {} is not visible to user {caller}",
                lead.id
            )))
        }
    }
}

#[async_trait]
impl QuoteService for SeaOrmQuoteService {
    async fn create_quote(
        &self,
        input: NewQuote,
        requested_by: UserId,
    ) -> Result<QuoteDto, QuoteError> {
        if input.contenido.is_null() {
            return Err(QuoteError::Validation(
                "contenido cannot be null".to_string(),
            ));
        }

        let contenido = serde_json::to_string(&input.contenido)
            .map_err(|e| QuoteError::Validation(format!("contenido is not valid JSON: {e}")))?;

        let quote = self.store.insert_quote(&contenido).await?;
        info!("Created presupuesto {}", quote.id);

        if let Some(lead_id) = input.lead_id {
            return self
                .attach(LeadId::new(lead_id), QuoteId::new(quote.id), requested_by)
                .await;
        }

        Ok(quote.into())
    }

    async fn get_quote(&self, id: QuoteId) -> Result<QuoteDto, QuoteError> {
        self.store
            .get_quote(id.value())
            .await?
            .map(Into::into)
            .ok_or(QuoteError::QuoteNotFound(id))
    }

    async fn attach(
        &self,
        lead_id: LeadId,
        quote_id: QuoteId,
        requested_by: UserId,
    ) -> Result<QuoteDto, QuoteError> {
        let lead = self.require_lead(lead_id).await?;
        self.require_access(requested_by, &lead).await?;

        if self.store.get_quote(quote_id.value()).await?.is_none() {
            return Err(QuoteError::QuoteNotFound(quote_id));
        }

        if !self.store.attach_quote(lead.id, quote_id.value()).await? {
            return Err(QuoteError::QuoteNotFound(quote_id));
        }

        info!("Presupuesto {} attached to lead {}", quote_id, lead.id);
        let _ = self.event_bus.send(CrmEvent::QuoteAttached {
            lead_id: lead.id,
            presupuesto_id: quote_id.value(),
        });

        self.store
            .get_quote(quote_id.value())
            .await?
            .map(Into::into)
            .ok_or(QuoteError::QuoteNotFound(quote_id))
    }

    async fn detach(&self, lead_id: LeadId, requested_by: UserId) -> Result<(), QuoteError> {
        let lead = self.require_lead(lead_id).await?;
        self.require_access(requested_by, &lead).await?;

        if self.store.detach_quote(lead.id).await? {
            info!("Presupuesto detached from lead {}", lead.id);
            let _ = self
                .event_bus
                .send(CrmEvent::QuoteDetached { lead_id: lead.id });
        }

        Ok(())
    }

    async fn active_for_lead(&self, lead_id: LeadId) -> Result<Option<QuoteDto>, QuoteError> {
        let lead = self.require_lead(lead_id).await?;
        let quote = self.store.active_quote_for_lead(lead.id).await?;
        Ok(quote.map(Into::into))
    }

    async fn list_for_lead(&self, lead_id: LeadId) -> Result<Vec<QuoteDto>, QuoteError> {
        let lead = self.require_lead(lead_id).await?;
        let quotes = self.store.list_quotes_for_lead(lead.id).await?;
        Ok(quotes.into_iter().map(Into::into).collect())
    }
}
