//! End-to-end lifecycle tests against the service layer over an in-memory
//! store: hierarchy resolution, pipeline transitions, assignment rules,
//! visibility and quote supersession.

use std::sync::Arc;

use plomo::Config;
use plomo::domain::{LeadId, QuoteId, UserId};
use plomo::entities::leads::Estado;
use plomo::entities::users::Role;
use plomo::services::{
    AssignmentError, LeadError, NewLead, NewQuote, NewUser, UserError, UserPatchInput,
};
use plomo::state::SharedState;

/// Bootstrap admin seeded by the initial migration.
const ADMIN: UserId = UserId::new(1);

async fn test_state() -> Arc<SharedState> {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.scheduler.enabled = false;
    config.server.enabled = false;

    Arc::new(
        SharedState::new(config)
            .await
            .expect("Failed to create test state"),
    )
}

async fn create_user(
    state: &SharedState,
    name: &str,
    role: Role,
    reports_to: Option<i32>,
) -> i32 {
    state
        .user_service
        .create_user(
            NewUser {
                name: name.to_string(),
                email: format!("{name}@concesionaria.local"),
                role,
                reports_to,
            },
            ADMIN,
        )
        .await
        .expect("Failed to create user")
        .id
}

async fn create_lead_for(state: &SharedState, vendedor: Option<i32>) -> i32 {
    state
        .lead_service
        .create_lead(
            NewLead {
                nombre: "Carlos Pérez".to_string(),
                telefono: "555-0101".to_string(),
                modelo: "Corolla XEI".to_string(),
                vendedor,
                ..Default::default()
            },
            ADMIN,
        )
        .await
        .expect("Failed to create lead")
        .id
}

async fn attach_fresh_quote(state: &SharedState, lead: i32) -> i32 {
    let quote = state
        .quote_service
        .create_quote(
            NewQuote {
                contenido: serde_json::json!({"total": 25_000, "moneda": "USD"}),
                lead_id: Some(lead),
            },
            ADMIN,
        )
        .await
        .expect("Failed to create/attach quote");
    quote.id
}

/// Walks an assigned lead from `nuevo` to `negociacion`, attaching a quote
/// on the way.
async fn advance_to_negociacion(state: &SharedState, lead: i32) {
    let lead_id = LeadId::new(lead);
    state
        .lead_service
        .transition(lead_id, Estado::Nuevo, Estado::Contactado, ADMIN)
        .await
        .unwrap();
    state
        .lead_service
        .transition(lead_id, Estado::Contactado, Estado::Calificado, ADMIN)
        .await
        .unwrap();
    attach_fresh_quote(state, lead).await;
    state
        .lead_service
        .transition(lead_id, Estado::Calificado, Estado::Presupuestado, ADMIN)
        .await
        .unwrap();
    state
        .lead_service
        .transition(lead_id, Estado::Presupuestado, Estado::Negociacion, ADMIN)
        .await
        .unwrap();
}

#[tokio::test]
async fn manager_chain_resolves_to_root_without_repeats() {
    let state = test_state().await;

    let director = create_user(&state, "director", Role::Manager, None).await;
    let gerente = create_user(&state, "gerente", Role::Manager, Some(director)).await;
    let vendedor = create_user(&state, "vendedor", Role::Vendedor, Some(gerente)).await;

    let chain = state
        .user_service
        .manager_chain(UserId::new(vendedor))
        .await
        .unwrap();

    let ids: Vec<i32> = chain.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![gerente, director]);

    let top_chain = state
        .user_service
        .manager_chain(UserId::new(director))
        .await
        .unwrap();
    assert!(top_chain.is_empty());
}

#[tokio::test]
async fn reporting_cycle_is_rejected() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let jefe = create_user(&state, "jefe", Role::Manager, Some(gerente)).await;

    let result = state
        .user_service
        .update_user(
            UserId::new(gerente),
            UserPatchInput {
                reports_to: Some(Some(jefe)),
                ..Default::default()
            },
            ADMIN,
        )
        .await;

    assert!(matches!(result, Err(UserError::Validation(_))));
}

#[tokio::test]
async fn transition_commits_and_stale_expectation_conflicts() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let vendedor = create_user(&state, "vendedor", Role::Vendedor, Some(gerente)).await;
    let lead = create_lead_for(&state, Some(vendedor)).await;

    let updated = state
        .lead_service
        .transition(
            LeadId::new(lead),
            Estado::Nuevo,
            Estado::Contactado,
            UserId::new(vendedor),
        )
        .await
        .unwrap();
    assert_eq!(updated.estado, Estado::Contactado);

    // Same expected-state replay must fail and leave the lead untouched.
    let stale = state
        .lead_service
        .transition(
            LeadId::new(lead),
            Estado::Nuevo,
            Estado::Contactado,
            UserId::new(vendedor),
        )
        .await;
    assert!(matches!(stale, Err(LeadError::Conflict(_))));

    let current = state
        .lead_service
        .get_lead(LeadId::new(lead), ADMIN)
        .await
        .unwrap();
    assert_eq!(current.estado, Estado::Contactado);
}

#[tokio::test]
async fn illegal_edges_are_rejected() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let vendedor = create_user(&state, "vendedor", Role::Vendedor, Some(gerente)).await;
    let lead = create_lead_for(&state, Some(vendedor)).await;

    let result = state
        .lead_service
        .transition(LeadId::new(lead), Estado::Nuevo, Estado::Ganado, ADMIN)
        .await;

    assert!(matches!(
        result,
        Err(LeadError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn presupuestado_requires_an_active_quote() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let vendedor = create_user(&state, "vendedor", Role::Vendedor, Some(gerente)).await;
    let lead = create_lead_for(&state, Some(vendedor)).await;
    let lead_id = LeadId::new(lead);

    state
        .lead_service
        .transition(lead_id, Estado::Nuevo, Estado::Contactado, ADMIN)
        .await
        .unwrap();
    state
        .lead_service
        .transition(lead_id, Estado::Contactado, Estado::Calificado, ADMIN)
        .await
        .unwrap();

    let blocked = state
        .lead_service
        .transition(lead_id, Estado::Calificado, Estado::Presupuestado, ADMIN)
        .await;
    assert!(matches!(blocked, Err(LeadError::Precondition(_))));

    attach_fresh_quote(&state, lead).await;

    let updated = state
        .lead_service
        .transition(lead_id, Estado::Calificado, Estado::Presupuestado, ADMIN)
        .await
        .unwrap();
    assert_eq!(updated.estado, Estado::Presupuestado);
}

#[tokio::test]
async fn closing_an_unassigned_lead_fails() {
    let state = test_state().await;

    let lead = create_lead_for(&state, None).await;

    let result = state
        .lead_service
        .transition(LeadId::new(lead), Estado::Nuevo, Estado::Perdido, ADMIN)
        .await;

    assert!(matches!(result, Err(LeadError::Precondition(_))));
}

#[tokio::test]
async fn reopening_a_lost_lead_starts_a_new_cycle() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let vendedor = create_user(&state, "vendedor", Role::Vendedor, Some(gerente)).await;
    let lead = create_lead_for(&state, Some(vendedor)).await;
    let lead_id = LeadId::new(lead);

    state
        .lead_service
        .transition(lead_id, Estado::Nuevo, Estado::Perdido, ADMIN)
        .await
        .unwrap();

    let reopened = state
        .lead_service
        .transition(lead_id, Estado::Perdido, Estado::Nuevo, ADMIN)
        .await
        .unwrap();

    assert_eq!(reopened.estado, Estado::Nuevo);
    assert_eq!(reopened.ciclo, 2);
}

#[tokio::test]
async fn vendor_cannot_reassign_but_their_manager_can() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let v1 = create_user(&state, "vendedor1", Role::Vendedor, Some(gerente)).await;
    let v2 = create_user(&state, "vendedor2", Role::Vendedor, Some(gerente)).await;
    let lead = create_lead_for(&state, Some(v1)).await;

    let denied = state
        .assignment_service
        .assign(LeadId::new(lead), UserId::new(v2), UserId::new(v1))
        .await;
    assert!(matches!(denied, Err(AssignmentError::Permission(_))));

    let updated = state
        .assignment_service
        .assign(LeadId::new(lead), UserId::new(v2), UserId::new(gerente))
        .await
        .unwrap();
    assert_eq!(updated.vendedor, Some(v2));

    // Reassignment never resets the pipeline state.
    assert_eq!(updated.estado, Estado::Nuevo);
}

#[tokio::test]
async fn assignment_history_is_append_only() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let v1 = create_user(&state, "vendedor1", Role::Vendedor, Some(gerente)).await;
    let v2 = create_user(&state, "vendedor2", Role::Vendedor, Some(gerente)).await;
    let lead = create_lead_for(&state, Some(v1)).await;

    state
        .assignment_service
        .assign(LeadId::new(lead), UserId::new(v2), UserId::new(gerente))
        .await
        .unwrap();

    let history = state
        .assignment_service
        .history(LeadId::new(lead), ADMIN)
        .await
        .unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].from_vendedor, None);
    assert_eq!(history[0].to_vendedor, v1);
    assert_eq!(history[1].from_vendedor, Some(v1));
    assert_eq!(history[1].to_vendedor, v2);
    assert_eq!(history[1].assigned_by, gerente);
}

#[tokio::test]
async fn visibility_follows_the_hierarchy() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let v1 = create_user(&state, "vendedor1", Role::Vendedor, Some(gerente)).await;
    let v2 = create_user(&state, "vendedor2", Role::Vendedor, Some(gerente)).await;
    let otro_gerente = create_user(&state, "otro", Role::Manager, None).await;
    let v3 = create_user(&state, "vendedor3", Role::Vendedor, Some(otro_gerente)).await;

    create_lead_for(&state, Some(v1)).await;
    create_lead_for(&state, Some(v1)).await;
    create_lead_for(&state, Some(v2)).await;
    create_lead_for(&state, Some(v3)).await;
    create_lead_for(&state, None).await;

    let admin_view = state
        .assignment_service
        .visible_leads_for(ADMIN)
        .await
        .unwrap();
    assert_eq!(admin_view.len(), 5);

    // Union over the subtree: v1's two plus v2's one, no duplicates.
    let manager_view = state
        .assignment_service
        .visible_leads_for(UserId::new(gerente))
        .await
        .unwrap();
    assert_eq!(manager_view.len(), 3);
    let mut seen: Vec<i32> = manager_view.iter().map(|l| l.id).collect();
    seen.dedup();
    assert_eq!(seen.len(), 3);

    let vendor_view = state
        .assignment_service
        .visible_leads_for(UserId::new(v1))
        .await
        .unwrap();
    assert_eq!(vendor_view.len(), 2);
    assert!(vendor_view.iter().all(|l| l.vendedor == Some(v1)));

    let other_view = state
        .assignment_service
        .visible_leads_for(UserId::new(v3))
        .await
        .unwrap();
    assert_eq!(other_view.len(), 1);
}

#[tokio::test]
async fn vendor_cannot_read_a_peers_lead() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let v1 = create_user(&state, "vendedor1", Role::Vendedor, Some(gerente)).await;
    let v2 = create_user(&state, "vendedor2", Role::Vendedor, Some(gerente)).await;
    let lead = create_lead_for(&state, Some(v1)).await;

    let denied = state
        .lead_service
        .get_lead(LeadId::new(lead), UserId::new(v2))
        .await;
    assert!(matches!(denied, Err(LeadError::Permission(_))));

    let allowed = state
        .lead_service
        .get_lead(LeadId::new(lead), UserId::new(gerente))
        .await;
    assert!(allowed.is_ok());
}

#[tokio::test]
async fn attaching_a_second_quote_supersedes_the_first() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let vendedor = create_user(&state, "vendedor", Role::Vendedor, Some(gerente)).await;
    let lead = create_lead_for(&state, Some(vendedor)).await;

    let q1 = attach_fresh_quote(&state, lead).await;
    let q2 = attach_fresh_quote(&state, lead).await;

    let first = state
        .quote_service
        .get_quote(QuoteId::new(q1))
        .await
        .unwrap();
    let second = state
        .quote_service
        .get_quote(QuoteId::new(q2))
        .await
        .unwrap();

    assert!(!first.activo);
    assert!(second.activo);
    assert_eq!(first.lead_id, Some(lead));

    let active = state
        .quote_service
        .active_for_lead(LeadId::new(lead))
        .await
        .unwrap();
    assert_eq!(active.map(|q| q.id), Some(q2));
}

#[tokio::test]
async fn detach_deactivates_without_deleting() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let vendedor = create_user(&state, "vendedor", Role::Vendedor, Some(gerente)).await;
    let lead = create_lead_for(&state, Some(vendedor)).await;
    let quote = attach_fresh_quote(&state, lead).await;

    state
        .quote_service
        .detach(LeadId::new(lead), ADMIN)
        .await
        .unwrap();

    let active = state
        .quote_service
        .active_for_lead(LeadId::new(lead))
        .await
        .unwrap();
    assert!(active.is_none());

    // The superseded quote still exists.
    let kept = state
        .quote_service
        .get_quote(QuoteId::new(quote))
        .await
        .unwrap();
    assert!(!kept.activo);
}

#[tokio::test]
async fn auto_assign_picks_the_least_loaded_vendedor() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let v1 = create_user(&state, "vendedor1", Role::Vendedor, Some(gerente)).await;
    let v2 = create_user(&state, "vendedor2", Role::Vendedor, Some(gerente)).await;

    // v1 carries two open leads, v2 none.
    create_lead_for(&state, Some(v1)).await;
    create_lead_for(&state, Some(v1)).await;

    let assigned = state
        .lead_service
        .create_lead(
            NewLead {
                nombre: "Lucía Gómez".to_string(),
                telefono: "555-0202".to_string(),
                modelo: "Hilux SRX".to_string(),
                auto_assign_under: Some(gerente),
                ..Default::default()
            },
            ADMIN,
        )
        .await
        .unwrap();

    assert_eq!(assigned.vendedor, Some(v2));
}

#[tokio::test]
async fn auto_assign_breaks_ties_by_lowest_id() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let v1 = create_user(&state, "vendedor1", Role::Vendedor, Some(gerente)).await;
    let _v2 = create_user(&state, "vendedor2", Role::Vendedor, Some(gerente)).await;

    let assigned = state
        .lead_service
        .create_lead(
            NewLead {
                nombre: "Mario Ruiz".to_string(),
                telefono: "555-0303".to_string(),
                modelo: "Etios XLS".to_string(),
                auto_assign_under: Some(gerente),
                ..Default::default()
            },
            ADMIN,
        )
        .await
        .unwrap();

    assert_eq!(assigned.vendedor, Some(v1));
}

#[tokio::test]
async fn deactivation_requires_reassignment_of_open_leads() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let v1 = create_user(&state, "vendedor1", Role::Vendedor, Some(gerente)).await;
    let v2 = create_user(&state, "vendedor2", Role::Vendedor, Some(gerente)).await;
    let lead = create_lead_for(&state, Some(v1)).await;

    advance_to_negociacion(&state, lead).await;

    let blocked = state
        .user_service
        .deactivate_user(UserId::new(v1), ADMIN)
        .await;
    assert!(matches!(blocked, Err(UserError::Conflict(_))));

    state
        .assignment_service
        .assign(LeadId::new(lead), UserId::new(v2), UserId::new(gerente))
        .await
        .unwrap();

    state
        .user_service
        .deactivate_user(UserId::new(v1), ADMIN)
        .await
        .unwrap();

    // A deactivated user can no longer receive leads.
    let invalid = state
        .assignment_service
        .assign(LeadId::new(lead), UserId::new(v1), UserId::new(gerente))
        .await;
    assert!(matches!(invalid, Err(AssignmentError::Validation(_))));
}

#[tokio::test]
async fn hard_delete_is_limited_to_leadless_users() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let v1 = create_user(&state, "vendedor1", Role::Vendedor, Some(gerente)).await;
    let v2 = create_user(&state, "vendedor2", Role::Vendedor, Some(gerente)).await;
    create_lead_for(&state, Some(v1)).await;

    let blocked = state.user_service.delete_user(UserId::new(v1), ADMIN).await;
    assert!(matches!(blocked, Err(UserError::Conflict(_))));

    state
        .user_service
        .delete_user(UserId::new(v2), ADMIN)
        .await
        .unwrap();

    let gone = state.user_service.get_user(UserId::new(v2)).await;
    assert!(matches!(gone, Err(UserError::NotFound(_))));
}

#[tokio::test]
async fn closing_a_negotiation_as_won() {
    let state = test_state().await;

    let gerente = create_user(&state, "gerente", Role::Manager, None).await;
    let vendedor = create_user(&state, "vendedor", Role::Vendedor, Some(gerente)).await;
    let lead = create_lead_for(&state, Some(vendedor)).await;

    advance_to_negociacion(&state, lead).await;

    let won = state
        .lead_service
        .transition(
            LeadId::new(lead),
            Estado::Negociacion,
            Estado::Ganado,
            UserId::new(vendedor),
        )
        .await
        .unwrap();

    assert_eq!(won.estado, Estado::Ganado);
    assert_eq!(won.ciclo, 1);
}
