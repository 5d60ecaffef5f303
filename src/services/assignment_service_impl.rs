//! `SeaORM` implementation of the `AssignmentService` trait.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::info;

use crate::api::types::{AssignmentDto, LeadDto};
use crate::db::Store;
use crate::domain::events::CrmEvent;
use crate::domain::{LeadId, UserId};
use crate::entities::users::{self, Role};
use crate::hierarchy::OrgTree;
use crate::services::assignment_service::{
    AssignmentError, AssignmentService, is_visible, pick_least_loaded,
};

pub struct SeaOrmAssignmentService {
    store: Store,
    event_bus: broadcast::Sender<CrmEvent>,
}

impl SeaOrmAssignmentService {
    #[must_use]
    pub const fn new(store: Store, event_bus: broadcast::Sender<CrmEvent>) -> Self {
        Self { store, event_bus }
    }

    async fn require_user(&self, id: UserId) -> Result<users::Model, AssignmentError> {
        self.store
            .get_user(id.value())
            .await?
            .ok_or(AssignmentError::UserNotFound(id))
    }

    async fn directory(&self) -> Result<(Vec<users::Model>, OrgTree), AssignmentError> {
        let rows = self.store.list_users().await?;
        let tree = OrgTree::from_users(&rows);
        Ok((rows, tree))
    }
}

#[async_trait]
impl AssignmentService for SeaOrmAssignmentService {
    async fn assign(
        &self,
        lead_id: LeadId,
        target: UserId,
        requested_by: UserId,
    ) -> Result<LeadDto, AssignmentError> {
        let lead = self
            .store
            .get_lead(lead_id.value())
            .await?
            .ok_or(AssignmentError::LeadNotFound(lead_id))?;

        let Some(target_user) = self.store.get_user(target.value()).await? else {
            return Err(AssignmentError::Validation(format!(
                "target user {target} does not exist"
            )));
        };
        if !target_user.active {
            return Err(AssignmentError::Validation(format!(
                "target user {target} is inactive"
            )));
        }
        if !target_user.role.can_own_leads() {
            return Err(AssignmentError::Validation(format!(
                "target user {target} has role {} and cannot own leads",
                target_user.role
            )));
        }

        let requester = self.require_user(requested_by).await?;
        let (_, tree) = self.directory().await?;

        // Admins assign freely; a manager may hand leads to anyone in
        // their subtree, or pull a lead whose current owner reports up to
        // them. Vendedores never reassign.
        let authorized = requester.role.is_admin()
            || tree.is_ancestor_of(requester.id, target_user.id)
            || (requester.role.covers(Role::Manager)
                && lead
                    .vendedor
                    .is_some_and(|owner| tree.subtree(requester.id).contains(&owner)));

        if !authorized {
            return Err(AssignmentError::Permission(format!(
                "user {} may not assign lead {} to user {}",
                requester.id, lead.id, target_user.id
            )));
        }

        let swapped = self
            .store
            .assign_lead_guarded(lead.id, lead.vendedor, target_user.id)
            .await?;
        if !swapped {
            return Err(AssignmentError::Conflict(format!(
                "lead {} owner changed concurrently",
                lead.id
            )));
        }

        self.store
            .append_assignment(lead.id, lead.vendedor, target_user.id, requester.id)
            .await?;

        metrics::counter!("plomo_lead_assignments_total").increment(1);
        info!(
            "Lead {} assigned to user {} by user {}",
            lead.id, target_user.id, requester.id
        );
        let _ = self.event_bus.send(CrmEvent::LeadAssigned {
            lead_id: lead.id,
            vendedor: target_user.id,
            assigned_by: requester.id,
        });

        let updated = self
            .store
            .get_lead(lead.id)
            .await?
            .ok_or(AssignmentError::LeadNotFound(lead_id))?;

        Ok(updated.into())
    }

    async fn auto_assign(
        &self,
        lead_id: LeadId,
        manager: UserId,
        requested_by: UserId,
    ) -> Result<Option<LeadDto>, AssignmentError> {
        let lead = self
            .store
            .get_lead(lead_id.value())
            .await?
            .ok_or(AssignmentError::LeadNotFound(lead_id))?;
        if lead.vendedor.is_some() {
            return Err(AssignmentError::Conflict(format!(
                "lead {} is already assigned",
                lead.id
            )));
        }

        let manager_user = self.require_user(manager).await?;
        let (rows, tree) = self.directory().await?;
        let subtree = tree.subtree(manager_user.id);

        let mut candidates = Vec::new();
        for user in &rows {
            if user.role == Role::Vendedor && user.active && subtree.contains(&user.id) {
                let open = self.store.count_open_leads(user.id).await?;
                candidates.push((user.id, open));
            }
        }

        let Some(chosen) = pick_least_loaded(&candidates) else {
            info!(
                "No eligible vendedor under manager {} for lead {}",
                manager_user.id, lead.id
            );
            return Ok(None);
        };

        let dto = self
            .assign(lead_id, UserId::new(chosen), requested_by)
            .await?;

        Ok(Some(dto))
    }

    async fn visible_leads_for(&self, user: UserId) -> Result<Vec<LeadDto>, AssignmentError> {
        let caller = self.require_user(user).await?;

        let leads = match caller.role {
            Role::Admin => self.store.list_leads().await?,
            Role::Manager => {
                let (_, tree) = self.directory().await?;
                let subtree = tree.subtree(caller.id);
                self.store.list_leads_by_vendedores(&subtree).await?
            }
            Role::Vendedor => self.store.list_leads_by_vendedores(&[caller.id]).await?,
        };

        Ok(leads.into_iter().map(Into::into).collect())
    }

    async fn can_access(
        &self,
        caller: UserId,
        lead_vendedor: Option<i32>,
    ) -> Result<bool, AssignmentError> {
        let caller = self.require_user(caller).await?;
        let (_, tree) = self.directory().await?;
        Ok(is_visible(&caller, lead_vendedor, &tree))
    }

    async fn history(
        &self,
        lead_id: LeadId,
        requested_by: UserId,
    ) -> Result<Vec<AssignmentDto>, AssignmentError> {
        let lead = self
            .store
            .get_lead(lead_id.value())
            .await?
            .ok_or(AssignmentError::LeadNotFound(lead_id))?;

        if !self.can_access(requested_by, lead.vendedor).await? {
            return Err(AssignmentError::Permission(format!(
                "lead {} is not visible to user {requested_by}",
                lead.id
            )));
        }

        let entries = self.store.list_assignments(lead.id).await?;
        Ok(entries.into_iter().map(Into::into).collect())
    }
}
