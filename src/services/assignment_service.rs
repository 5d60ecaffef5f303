//! Assignment engine: who may hold a lead, and who may see it.
//!
//! Both decisions are derived from the persisted reporting hierarchy on
//! every call; nothing is cached between requests.

use thiserror::Error;

use crate::api::types::{AssignmentDto, LeadDto};
use crate::db;
use crate::domain::{LeadId, UserId};
use crate::entities::users::{self, Role};
use crate::hierarchy::OrgTree;

/// Errors specific to assignment and visibility operations.
#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("Lead not found: {0}")]
    LeadNotFound(LeadId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for AssignmentError {
    fn from(err: sea_orm::DbErr) -> Self {
        if db::is_unavailable(&err) {
            Self::Unavailable(err.to_string())
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<anyhow::Error> for AssignmentError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<sea_orm::DbErr>() {
            Some(db_err) if db::is_unavailable(db_err) => Self::Unavailable(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

/// Domain service trait for the assignment engine.
#[async_trait::async_trait]
pub trait AssignmentService: Send + Sync {
    /// Hands a lead to `target`.
    ///
    /// Allowed when the caller is an admin, an ancestor manager of the
    /// target, or the current owner sits in the caller's subtree. The
    /// handover is guarded on the owner observed at decision time; a racing
    /// reassignment surfaces as [`AssignmentError::Conflict`].
    ///
    /// # Errors
    ///
    /// - [`AssignmentError::Validation`] if the target is unknown, inactive
    ///   or cannot own leads
    /// - [`AssignmentError::Permission`] if the caller lacks authority
    async fn assign(
        &self,
        lead_id: LeadId,
        target: UserId,
        requested_by: UserId,
    ) -> Result<LeadDto, AssignmentError>;

    /// Assigns an unowned lead to the least-loaded active vendedor in
    /// `manager`'s subtree. Returns `None` when no candidate exists.
    async fn auto_assign(
        &self,
        lead_id: LeadId,
        manager: UserId,
        requested_by: UserId,
    ) -> Result<Option<LeadDto>, AssignmentError>;

    /// Every lead the given user may see: own leads for a vendedor, the
    /// whole subtree for a manager, everything for an admin.
    async fn visible_leads_for(&self, user: UserId) -> Result<Vec<LeadDto>, AssignmentError>;

    /// Whether `caller` may view/mutate a lead owned by `lead_vendedor`.
    async fn can_access(
        &self,
        caller: UserId,
        lead_vendedor: Option<i32>,
    ) -> Result<bool, AssignmentError>;

    /// Append-only audit trail of a lead's assignments.
    async fn history(
        &self,
        lead_id: LeadId,
        requested_by: UserId,
    ) -> Result<Vec<AssignmentDto>, AssignmentError>;
}

/// Visibility policy, pure over a directory snapshot.
#[must_use]
pub fn is_visible(caller: &users::Model, lead_vendedor: Option<i32>, tree: &OrgTree) -> bool {
    match caller.role {
        Role::Admin => true,
        Role::Manager => {
            lead_vendedor.is_some_and(|owner| tree.subtree(caller.id).contains(&owner))
        }
        Role::Vendedor => lead_vendedor == Some(caller.id),
    }
}

/// Round-robin choice: fewest open leads wins, ties go to the lowest id so
/// the outcome is deterministic.
#[must_use]
pub fn pick_least_loaded(candidates: &[(i32, u64)]) -> Option<i32> {
    candidates
        .iter()
        .copied()
        .min_by_key(|&(id, open)| (open, id))
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i32, role: Role, reports_to: Option<i32>) -> users::Model {
        users::Model {
            id,
            name: format!("user-{id}"),
            email: format!("user-{id}@example.com"),
            role,
            reports_to,
            active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn vendedor_sees_only_own_leads() {
        let rows = vec![
            user(1, Role::Manager, None),
            user(2, Role::Vendedor, Some(1)),
            user(3, Role::Vendedor, Some(1)),
        ];
        let tree = OrgTree::from_users(&rows);

        assert!(is_visible(&rows[1], Some(2), &tree));
        assert!(!is_visible(&rows[1], Some(3), &tree));
        assert!(!is_visible(&rows[1], None, &tree));
    }

    #[test]
    fn manager_sees_subtree_inclusive_of_self() {
        let rows = vec![
            user(1, Role::Manager, None),
            user(2, Role::Vendedor, Some(1)),
            user(3, Role::Manager, Some(1)),
            user(4, Role::Vendedor, Some(3)),
            user(5, Role::Vendedor, None),
        ];
        let tree = OrgTree::from_users(&rows);

        assert!(is_visible(&rows[0], Some(1), &tree));
        assert!(is_visible(&rows[0], Some(2), &tree));
        assert!(is_visible(&rows[0], Some(4), &tree));
        assert!(!is_visible(&rows[0], Some(5), &tree));
        assert!(!is_visible(&rows[2], Some(2), &tree));
    }

    #[test]
    fn admin_sees_everything() {
        let rows = vec![user(9, Role::Admin, None), user(2, Role::Vendedor, None)];
        let tree = OrgTree::from_users(&rows);

        assert!(is_visible(&rows[0], Some(2), &tree));
        assert!(is_visible(&rows[0], None, &tree));
    }

    #[test]
    fn least_loaded_picks_fewest_open_leads() {
        assert_eq!(pick_least_loaded(&[(1, 2), (2, 0)]), Some(2));
        assert_eq!(pick_least_loaded(&[(1, 3), (2, 1), (3, 1)]), Some(2));
        assert_eq!(pick_least_loaded(&[]), None);
    }

    #[test]
    fn least_loaded_ties_break_to_lowest_id() {
        assert_eq!(pick_least_loaded(&[(7, 1), (3, 1), (5, 1)]), Some(3));
    }
}
