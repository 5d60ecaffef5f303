use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::users::Role;
use crate::entities::{assignment_log, leads, presupuestos, users};

pub mod migrator;
pub mod repositories;

pub use repositories::lead::{LeadPatch, NewLeadRow};
pub use repositories::user::UserPatch;

/// True when a store error is a timeout/connectivity failure the caller may
/// safely retry, as opposed to a query or constraint failure.
#[must_use]
pub fn is_unavailable(err: &DbErr) -> bool {
    matches!(err, DbErr::ConnectionAcquire(_) | DbErr::Conn(_))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn lead_repo(&self) -> repositories::lead::LeadRepository {
        repositories::lead::LeadRepository::new(self.conn.clone())
    }

    fn quote_repo(&self) -> repositories::quote::QuoteRepository {
        repositories::quote::QuoteRepository::new(self.conn.clone())
    }

    fn assignment_repo(&self) -> repositories::assignment::AssignmentRepository {
        repositories::assignment::AssignmentRepository::new(self.conn.clone())
    }

    // ========================================================================
    // User directory
    // ========================================================================

    pub async fn get_user(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().get(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<users::Model>> {
        self.user_repo().list().await
    }

    pub async fn insert_user(
        &self,
        name: &str,
        email: &str,
        role: Role,
        reports_to: Option<i32>,
    ) -> Result<users::Model> {
        self.user_repo().insert(name, email, role, reports_to).await
    }

    pub async fn update_user_fields(
        &self,
        id: i32,
        patch: UserPatch,
    ) -> Result<Option<users::Model>> {
        self.user_repo().update_fields(id, patch).await
    }

    pub async fn set_user_active(&self, id: i32, active: bool) -> Result<bool> {
        self.user_repo().set_active(id, active).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    // ========================================================================
    // Leads
    // ========================================================================

    pub async fn insert_lead(&self, row: NewLeadRow) -> Result<leads::Model> {
        self.lead_repo().insert(row).await
    }

    pub async fn get_lead(&self, id: i32) -> Result<Option<leads::Model>> {
        self.lead_repo().get(id).await
    }

    pub async fn list_leads(&self) -> Result<Vec<leads::Model>> {
        self.lead_repo().list_all().await
    }

    pub async fn list_leads_by_vendedores(&self, vendedores: &[i32]) -> Result<Vec<leads::Model>> {
        self.lead_repo().list_by_vendedores(vendedores).await
    }

    pub async fn update_lead_fields(
        &self,
        id: i32,
        patch: LeadPatch,
    ) -> Result<Option<leads::Model>> {
        self.lead_repo().update_fields(id, patch).await
    }

    pub async fn delete_lead(&self, id: i32) -> Result<bool> {
        self.lead_repo().delete(id).await
    }

    pub async fn transition_lead_guarded(
        &self,
        id: i32,
        expected: leads::Estado,
        to: leads::Estado,
        bump_ciclo: bool,
    ) -> Result<bool> {
        self.lead_repo()
            .transition_guarded(id, expected, to, bump_ciclo)
            .await
    }

    pub async fn assign_lead_guarded(
        &self,
        id: i32,
        expected_vendedor: Option<i32>,
        new_vendedor: i32,
    ) -> Result<bool> {
        self.lead_repo()
            .assign_guarded(id, expected_vendedor, new_vendedor)
            .await
    }

    pub async fn count_open_leads(&self, vendedor: i32) -> Result<u64> {
        self.lead_repo().count_open_by_vendedor(vendedor).await
    }

    pub async fn count_leads_owned(&self, vendedor: i32) -> Result<u64> {
        self.lead_repo().count_by_vendedor(vendedor).await
    }

    pub async fn list_overdue_leads(&self, cutoff: &str) -> Result<Vec<leads::Model>> {
        self.lead_repo().list_overdue(cutoff).await
    }

    // ========================================================================
    // Presupuestos
    // ========================================================================

    pub async fn insert_quote(&self, contenido: &str) -> Result<presupuestos::Model> {
        self.quote_repo().insert(contenido).await
    }

    pub async fn get_quote(&self, id: i32) -> Result<Option<presupuestos::Model>> {
        self.quote_repo().get(id).await
    }

    pub async fn active_quote_for_lead(
        &self,
        lead_id: i32,
    ) -> Result<Option<presupuestos::Model>> {
        self.quote_repo().active_for_lead(lead_id).await
    }

    pub async fn list_quotes_for_lead(&self, lead_id: i32) -> Result<Vec<presupuestos::Model>> {
        self.quote_repo().list_for_lead(lead_id).await
    }

    pub async fn attach_quote(&self, lead_id: i32, quote_id: i32) -> Result<bool> {
        self.quote_repo().attach(lead_id, quote_id).await
    }

    pub async fn detach_quote(&self, lead_id: i32) -> Result<bool> {
        self.quote_repo().detach(lead_id).await
    }

    // ========================================================================
    // Assignment log
    // ========================================================================

    pub async fn append_assignment(
        &self,
        lead_id: i32,
        from_vendedor: Option<i32>,
        to_vendedor: i32,
        assigned_by: i32,
    ) -> Result<()> {
        self.assignment_repo()
            .append(lead_id, from_vendedor, to_vendedor, assigned_by)
            .await
    }

    pub async fn list_assignments(&self, lead_id: i32) -> Result<Vec<assignment_log::Model>> {
        self.assignment_repo().list_for_lead(lead_id).await
    }
}
