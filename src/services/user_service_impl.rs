//! `SeaORM` implementation of the `UserService` trait.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::info;

use crate::api::types::UserDto;
use crate::db::{Store, UserPatch};
use crate::domain::UserId;
use crate::domain::events::CrmEvent;
use crate::entities::users::{self, Role};
use crate::hierarchy::OrgTree;
use crate::services::user_service::{NewUser, UserError, UserPatchInput, UserService};

pub struct SeaOrmUserService {
    store: Store,
    event_bus: broadcast::Sender<CrmEvent>,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, event_bus: broadcast::Sender<CrmEvent>) -> Self {
        Self { store, event_bus }
    }

    async fn require_user(&self, id: UserId) -> Result<users::Model, UserError> {
        self.store
            .get_user(id.value())
            .await?
            .ok_or(UserError::NotFound(id))
    }

    async fn directory(&self) -> Result<(Vec<users::Model>, OrgTree), UserError> {
        let rows = self.store.list_users().await?;
        let tree = OrgTree::from_users(&rows);
        Ok((rows, tree))
    }

    /// Admins may manage anyone; managers may manage users in their own
    /// subtree.
    async fn require_authority_over(
        &self,
        requester: &users::Model,
        target: i32,
    ) -> Result<(), UserError> {
        if requester.role.is_admin() {
            return Ok(());
        }

        let (_, tree) = self.directory().await?;
        if requester.role.covers(Role::Manager) && tree.is_ancestor_of(requester.id, target) {
            return Ok(());
        }

        Err(UserError::Permission(
            "caller has no authority over this user".to_string(),
        ))
    }

    async fn validate_manager_ref(&self, manager_id: i32) -> Result<(), UserError> {
        let Some(manager) = self.store.get_user(manager_id).await? else {
            return Err(UserError::Validation(format!(
                "reports_to references unknown user {manager_id}"
            )));
        };
        if !manager.active {
            return Err(UserError::Validation(format!(
                "reports_to references inactive user {manager_id}"
            )));
        }
        if !manager.role.covers(Role::Manager) {
            return Err(UserError::Validation(
                "reports_to must reference a manager".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn create_user(
        &self,
        input: NewUser,
        requested_by: UserId,
    ) -> Result<UserDto, UserError> {
        let requester = self.require_user(requested_by).await?;
        if !requester.role.is_admin() {
            return Err(UserError::Permission(
                "only an admin may create users".to_string(),
            ));
        }

        if input.name.trim().is_empty() {
            return Err(UserError::Validation("name is required".to_string()));
        }
        if input.email.trim().is_empty() || !input.email.contains('@') {
            return Err(UserError::Validation("a valid email is required".to_string()));
        }

        if self.store.get_user_by_email(&input.email).await?.is_some() {
            return Err(UserError::Conflict(format!(
                "email {} is already registered",
                input.email
            )));
        }

        if let Some(manager_id) = input.reports_to {
            self.validate_manager_ref(manager_id).await?;
        }

        let user = self
            .store
            .insert_user(&input.name, &input.email, input.role, input.reports_to)
            .await?;

        info!("Created user {} ({}, {})", user.id, user.email, user.role);

        Ok(user.into())
    }

    async fn update_user(
        &self,
        id: UserId,
        patch: UserPatchInput,
        requested_by: UserId,
    ) -> Result<UserDto, UserError> {
        let requester = self.require_user(requested_by).await?;
        let target = self.require_user(id).await?;
        self.require_authority_over(&requester, target.id).await?;

        if let Some(email) = &patch.email {
            if email.trim().is_empty() || !email.contains('@') {
                return Err(UserError::Validation("a valid email is required".to_string()));
            }
            if let Some(existing) = self.store.get_user_by_email(email).await?
                && existing.id != target.id
            {
                return Err(UserError::Conflict(format!(
                    "email {email} is already registered"
                )));
            }
        }

        if let Some(role) = patch.role
            && !role.can_own_leads()
            && self.store.count_leads_owned(target.id).await? > 0
        {
            return Err(UserError::Conflict(
                "user owns leads and must keep a lead-holding role".to_string(),
            ));
        }

        if let Some(Some(manager_id)) = patch.reports_to {
            self.validate_manager_ref(manager_id).await?;

            let (_, tree) = self.directory().await?;
            if tree.would_create_cycle(target.id, manager_id) {
                return Err(UserError::Validation(
                    "reports_to would introduce a reporting cycle".to_string(),
                ));
            }
        }

        let updated = self
            .store
            .update_user_fields(
                target.id,
                UserPatch {
                    name: patch.name,
                    email: patch.email,
                    role: patch.role,
                    reports_to: patch.reports_to,
                },
            )
            .await?
            .ok_or(UserError::NotFound(id))?;

        Ok(updated.into())
    }

    async fn deactivate_user(&self, id: UserId, requested_by: UserId) -> Result<(), UserError> {
        let requester = self.require_user(requested_by).await?;
        let target = self.require_user(id).await?;
        self.require_authority_over(&requester, target.id).await?;

        let open = self.store.count_open_leads(target.id).await?;
        if open > 0 {
            return Err(UserError::Conflict(format!(
                "user {} still owns {open} open lead(s); reassign them first",
                target.id
            )));
        }

        self.store.set_user_active(target.id, false).await?;

        info!("Deactivated user {} ({})", target.id, target.email);
        let _ = self.event_bus.send(CrmEvent::UserDeactivated { user_id: target.id });

        Ok(())
    }

    async fn delete_user(&self, id: UserId, requested_by: UserId) -> Result<(), UserError> {
        let requester = self.require_user(requested_by).await?;
        if !requester.role.is_admin() {
            return Err(UserError::Permission(
                "only an admin may delete users".to_string(),
            ));
        }

        let target = self.require_user(id).await?;

        let owned = self.store.count_leads_owned(target.id).await?;
        if owned > 0 {
            return Err(UserError::Conflict(format!(
                "user {} owns {owned} lead(s) and can only be deactivated",
                target.id
            )));
        }

        if !self.store.delete_user(target.id).await? {
            return Err(UserError::NotFound(id));
        }

        info!("Deleted user {} ({})", target.id, target.email);

        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<UserDto, UserError> {
        self.require_user(id).await.map(Into::into)
    }

    async fn list_users(&self) -> Result<Vec<UserDto>, UserError> {
        let rows = self.store.list_users().await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn manager_chain(&self, id: UserId) -> Result<Vec<UserDto>, UserError> {
        let user = self.require_user(id).await?;
        let (rows, tree) = self.directory().await?;

        let chain = tree
            .manager_chain(user.id)
            .into_iter()
            .filter_map(|ancestor| rows.iter().find(|u| u.id == ancestor).cloned())
            .map(Into::into)
            .collect();

        Ok(chain)
    }
}
