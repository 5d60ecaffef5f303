use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use crate::config::Config;
use crate::db::Store;
use crate::domain::events::CrmEvent;
use crate::services::{
    AssignmentService, FollowupService, LeadService, QuoteService, SeaOrmAssignmentService,
    SeaOrmLeadService, SeaOrmQuoteService, SeaOrmUserService, UserService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub event_bus: broadcast::Sender<CrmEvent>,

    pub user_service: Arc<dyn UserService>,

    pub lead_service: Arc<dyn LeadService>,

    pub assignment_service: Arc<dyn AssignmentService>,

    pub quote_service: Arc<dyn QuoteService>,

    pub followups: Arc<FollowupService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);
        Self::with_event_bus(config, event_bus).await
    }

    pub async fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<CrmEvent>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let assignment_service = Arc::new(SeaOrmAssignmentService::new(
            store.clone(),
            event_bus.clone(),
        )) as Arc<dyn AssignmentService>;

        let lead_service = Arc::new(SeaOrmLeadService::new(
            store.clone(),
            assignment_service.clone(),
            config.assignment.clone(),
            event_bus.clone(),
        )) as Arc<dyn LeadService>;

        let quote_service = Arc::new(SeaOrmQuoteService::new(
            store.clone(),
            assignment_service.clone(),
            event_bus.clone(),
        )) as Arc<dyn QuoteService>;

        let user_service = Arc::new(SeaOrmUserService::new(store.clone(), event_bus.clone()))
            as Arc<dyn UserService>;

        let followups = Arc::new(FollowupService::new(store.clone(), event_bus.clone()));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            event_bus,
            user_service,
            lead_service,
            assignment_service,
            quote_service,
            followups,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}

/// Drains the event bus into the structured log. Push delivery to clients
/// is out of scope; this keeps every domain event observable anyway.
pub fn start_event_logger(event_bus: &broadcast::Sender<CrmEvent>) -> tokio::task::JoinHandle<()> {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let payload =
                        serde_json::to_string(&event).unwrap_or_else(|_| format!("{event:?}"));
                    debug!(event = %payload, "Domain event");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Event logger lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
