use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::{prelude::*, presupuestos};

pub struct QuoteRepository {
    conn: DatabaseConnection,
}

impl QuoteRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, contenido: &str) -> Result<presupuestos::Model> {
        let active_model = presupuestos::ActiveModel {
            lead_id: Set(None),
            contenido: Set(contenido.to_string()),
            activo: Set(false),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        active_model
            .insert(&self.conn)
            .await
            .context("Failed to insert presupuesto")
    }

    pub async fn get(&self, id: i32) -> Result<Option<presupuestos::Model>> {
        Presupuestos::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query presupuesto by id")
    }

    pub async fn active_for_lead(&self, lead_id: i32) -> Result<Option<presupuestos::Model>> {
        Presupuestos::find()
            .filter(presupuestos::Column::LeadId.eq(lead_id))
            .filter(presupuestos::Column::Activo.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query active presupuesto for lead")
    }

    pub async fn list_for_lead(&self, lead_id: i32) -> Result<Vec<presupuestos::Model>> {
        Presupuestos::find()
            .filter(presupuestos::Column::LeadId.eq(lead_id))
            .order_by_asc(presupuestos::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list presupuestos for lead")
    }

    /// Makes `quote_id` the single active quote of `lead_id`. The previous
    /// active quote is deactivated, never deleted, in the same transaction,
    /// so a half-applied supersession is never observable.
    pub async fn attach(&self, lead_id: i32, quote_id: i32) -> Result<bool> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to open attach transaction")?;

        Presupuestos::update_many()
            .col_expr(presupuestos::Column::Activo, Expr::value(false))
            .filter(presupuestos::Column::LeadId.eq(lead_id))
            .filter(presupuestos::Column::Activo.eq(true))
            .exec(&txn)
            .await
            .context("Failed to supersede active presupuesto")?;

        let result = Presupuestos::update_many()
            .col_expr(presupuestos::Column::Activo, Expr::value(true))
            .col_expr(presupuestos::Column::LeadId, Expr::value(lead_id))
            .filter(presupuestos::Column::Id.eq(quote_id))
            .exec(&txn)
            .await
            .context("Failed to activate presupuesto")?;

        if result.rows_affected == 0 {
            txn.rollback()
                .await
                .context("Failed to roll back attach transaction")?;
            return Ok(false);
        }

        txn.commit()
            .await
            .context("Failed to commit attach transaction")?;

        Ok(true)
    }

    pub async fn detach(&self, lead_id: i32) -> Result<bool> {
        let result = Presupuestos::update_many()
            .col_expr(presupuestos::Column::Activo, Expr::value(false))
            .filter(presupuestos::Column::LeadId.eq(lead_id))
            .filter(presupuestos::Column::Activo.eq(true))
            .exec(&self.conn)
            .await
            .context("Failed to detach presupuesto")?;

        Ok(result.rows_affected > 0)
    }
}
