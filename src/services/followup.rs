//! Periodic sweep for overdue follow-ups.
//!
//! `fecha` is the scheduled follow-up date of a lead. The sweep reports
//! leads still in play whose date has passed; it never mutates state.

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::warn;

use crate::db::Store;
use crate::domain::events::CrmEvent;

#[derive(Debug, Clone, Copy, Default)]
pub struct FollowupStats {
    pub overdue: usize,
}

pub struct FollowupService {
    store: Store,
    event_bus: broadcast::Sender<CrmEvent>,
}

impl FollowupService {
    #[must_use]
    pub const fn new(store: Store, event_bus: broadcast::Sender<CrmEvent>) -> Self {
        Self { store, event_bus }
    }

    pub async fn sweep(&self) -> Result<FollowupStats> {
        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();

        let overdue = self.store.list_overdue_leads(&today).await?;

        for lead in &overdue {
            let fecha = lead.fecha.clone().unwrap_or_default();
            warn!(
                "Lead {} ({}) follow-up overdue since {}",
                lead.id, lead.nombre, fecha
            );
            let _ = self.event_bus.send(CrmEvent::FollowupOverdue {
                lead_id: lead.id,
                fecha,
            });
        }

        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!("plomo_followups_overdue").set(overdue.len() as f64);

        Ok(FollowupStats {
            overdue: overdue.len(),
        })
    }
}
