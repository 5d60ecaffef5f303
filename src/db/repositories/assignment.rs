use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{assignment_log, prelude::*};

/// Append-only audit trail of lead handovers.
pub struct AssignmentRepository {
    conn: DatabaseConnection,
}

impl AssignmentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn append(
        &self,
        lead_id: i32,
        from_vendedor: Option<i32>,
        to_vendedor: i32,
        assigned_by: i32,
    ) -> Result<()> {
        let active_model = assignment_log::ActiveModel {
            lead_id: Set(lead_id),
            from_vendedor: Set(from_vendedor),
            to_vendedor: Set(to_vendedor),
            assigned_by: Set(assigned_by),
            assigned_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        active_model
            .insert(&self.conn)
            .await
            .context("Failed to append assignment log entry")?;

        Ok(())
    }

    pub async fn list_for_lead(&self, lead_id: i32) -> Result<Vec<assignment_log::Model>> {
        AssignmentLog::find()
            .filter(assignment_log::Column::LeadId.eq(lead_id))
            .order_by_asc(assignment_log::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list assignment log for lead")
    }
}
