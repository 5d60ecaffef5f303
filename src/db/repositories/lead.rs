use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::leads::Estado;
use crate::entities::{leads, prelude::*};

/// Input for a new lead row. `estado` always starts at `Nuevo`.
#[derive(Debug, Clone, Default)]
pub struct NewLeadRow {
    pub nombre: String,
    pub telefono: String,
    pub modelo: String,
    pub forma_pago: Option<String>,
    pub info_usado: Option<String>,
    pub entrega: Option<bool>,
    pub fecha: Option<String>,
    pub vendedor: Option<i32>,
    pub notas: String,
    pub fuente: Option<String>,
}

/// Partial update of the contact/vehicle fields. `estado` and `vendedor`
/// are deliberately absent; those move only through the guarded writes.
#[derive(Debug, Clone, Default)]
pub struct LeadPatch {
    pub nombre: Option<String>,
    pub telefono: Option<String>,
    pub modelo: Option<String>,
    pub forma_pago: Option<Option<String>>,
    pub info_usado: Option<Option<String>>,
    pub entrega: Option<Option<bool>>,
    pub fecha: Option<Option<String>>,
    pub notas: Option<String>,
    pub fuente: Option<Option<String>>,
}

pub struct LeadRepository {
    conn: DatabaseConnection,
}

impl LeadRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, row: NewLeadRow) -> Result<leads::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let active_model = leads::ActiveModel {
            nombre: Set(row.nombre),
            telefono: Set(row.telefono),
            modelo: Set(row.modelo),
            forma_pago: Set(row.forma_pago),
            info_usado: Set(row.info_usado),
            entrega: Set(row.entrega),
            fecha: Set(row.fecha),
            estado: Set(Estado::Nuevo),
            vendedor: Set(row.vendedor),
            notas: Set(row.notas),
            fuente: Set(row.fuente),
            ciclo: Set(1),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model
            .insert(&self.conn)
            .await
            .context("Failed to insert lead")
    }

    pub async fn get(&self, id: i32) -> Result<Option<leads::Model>> {
        Leads::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query lead by id")
    }

    pub async fn list_all(&self) -> Result<Vec<leads::Model>> {
        Leads::find()
            .order_by_asc(leads::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list leads")
    }

    pub async fn list_by_vendedores(&self, vendedores: &[i32]) -> Result<Vec<leads::Model>> {
        if vendedores.is_empty() {
            return Ok(Vec::new());
        }

        Leads::find()
            .filter(leads::Column::Vendedor.is_in(vendedores.iter().copied()))
            .order_by_asc(leads::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list leads by vendedor")
    }

    pub async fn update_fields(&self, id: i32, patch: LeadPatch) -> Result<Option<leads::Model>> {
        let Some(lead) = Leads::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query lead for update")?
        else {
            return Ok(None);
        };

        let mut active: leads::ActiveModel = lead.into();

        if let Some(nombre) = patch.nombre {
            active.nombre = Set(nombre);
        }
        if let Some(telefono) = patch.telefono {
            active.telefono = Set(telefono);
        }
        if let Some(modelo) = patch.modelo {
            active.modelo = Set(modelo);
        }
        if let Some(forma_pago) = patch.forma_pago {
            active.forma_pago = Set(forma_pago);
        }
        if let Some(info_usado) = patch.info_usado {
            active.info_usado = Set(info_usado);
        }
        if let Some(entrega) = patch.entrega {
            active.entrega = Set(entrega);
        }
        if let Some(fecha) = patch.fecha {
            active.fecha = Set(fecha);
        }
        if let Some(notas) = patch.notas {
            active.notas = Set(notas);
        }
        if let Some(fuente) = patch.fuente {
            active.fuente = Set(fuente);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update lead")?;

        Ok(Some(updated))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Leads::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete lead")?;

        Ok(result.rows_affected > 0)
    }

    /// Compare-and-swap move of `estado`. The filter on the expected state
    /// makes the write atomic against racing callers; a stale expectation
    /// simply matches zero rows.
    pub async fn transition_guarded(
        &self,
        id: i32,
        expected: Estado,
        to: Estado,
        bump_ciclo: bool,
    ) -> Result<bool> {
        let mut update = Leads::update_many()
            .col_expr(leads::Column::Estado, Expr::value(to))
            .col_expr(
                leads::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(leads::Column::Id.eq(id))
            .filter(leads::Column::Estado.eq(expected));

        if bump_ciclo {
            update = update.col_expr(
                leads::Column::Ciclo,
                Expr::col(leads::Column::Ciclo).add(1),
            );
        }

        let result = update
            .exec(&self.conn)
            .await
            .context("Failed to transition lead estado")?;

        Ok(result.rows_affected > 0)
    }

    /// Compare-and-swap handover of `vendedor`, guarded on the currently
    /// observed owner so two managers cannot both win the same handover.
    pub async fn assign_guarded(
        &self,
        id: i32,
        expected_vendedor: Option<i32>,
        new_vendedor: i32,
    ) -> Result<bool> {
        let owner_guard = match expected_vendedor {
            Some(v) => leads::Column::Vendedor.eq(v),
            None => leads::Column::Vendedor.is_null(),
        };

        let result = Leads::update_many()
            .col_expr(leads::Column::Vendedor, Expr::value(new_vendedor))
            .col_expr(
                leads::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(leads::Column::Id.eq(id))
            .filter(owner_guard)
            .exec(&self.conn)
            .await
            .context("Failed to assign lead vendedor")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_open_by_vendedor(&self, vendedor: i32) -> Result<u64> {
        Leads::find()
            .filter(leads::Column::Vendedor.eq(vendedor))
            .filter(leads::Column::Estado.is_not_in([Estado::Ganado, Estado::Perdido]))
            .count(&self.conn)
            .await
            .context("Failed to count open leads for vendedor")
    }

    pub async fn count_by_vendedor(&self, vendedor: i32) -> Result<u64> {
        Leads::find()
            .filter(leads::Column::Vendedor.eq(vendedor))
            .count(&self.conn)
            .await
            .context("Failed to count leads for vendedor")
    }

    /// Leads still in play whose follow-up date is strictly before `cutoff`
    /// (ISO dates compare lexicographically).
    pub async fn list_overdue(&self, cutoff: &str) -> Result<Vec<leads::Model>> {
        Leads::find()
            .filter(leads::Column::Fecha.is_not_null())
            .filter(leads::Column::Fecha.lt(cutoff))
            .filter(leads::Column::Estado.is_not_in([Estado::Ganado, Estado::Perdido]))
            .order_by_asc(leads::Column::Fecha)
            .all(&self.conn)
            .await
            .context("Failed to list overdue leads")
    }
}
