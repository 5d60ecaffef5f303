use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

mod error;
pub mod identity;
mod leads;
mod observability;
mod presupuestos;
mod system;
pub mod types;
mod users;

pub use error::ApiError;
pub use identity::Caller;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::RwLock;

use crate::domain::events::CrmEvent;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn event_bus(&self) -> &tokio::sync::broadcast::Sender<CrmEvent> {
        &self.shared.event_bus
    }

    #[must_use]
    pub fn users(&self) -> &Arc<dyn crate::services::UserService> {
        &self.shared.user_service
    }

    #[must_use]
    pub fn leads(&self) -> &Arc<dyn crate::services::LeadService> {
        &self.shared.lead_service
    }

    #[must_use]
    pub fn assignments(&self) -> &Arc<dyn crate::services::AssignmentService> {
        &self.shared.assignment_service
    }

    #[must_use]
    pub fn quotes(&self) -> &Arc<dyn crate::services::QuoteService> {
        &self.shared.quote_service
    }
}

pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = {
        let config = state.config().read().await;
        config.server.cors_allowed_origins.clone()
    };

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/leads", get(leads::list_leads))
        .route("/leads", post(leads::create_lead))
        .route("/leads/{id}", get(leads::get_lead))
        .route("/leads/{id}", put(leads::update_lead))
        .route("/leads/{id}", delete(leads::delete_lead))
        .route("/leads/{id}/assign", post(leads::assign_lead))
        .route("/leads/{id}/transition", post(leads::transition_lead))
        .route("/leads/{id}/assignments", get(leads::assignment_history))
        .route("/leads/{id}/presupuesto", post(presupuestos::attach_quote))
        .route(
            "/leads/{id}/presupuesto",
            delete(presupuestos::detach_quote),
        )
        .route(
            "/leads/{id}/presupuestos",
            get(presupuestos::list_quotes_for_lead),
        )
        .route("/presupuestos", post(presupuestos::create_quote))
        .route("/presupuestos/{id}", get(presupuestos::get_quote))
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", put(users::update_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/deactivate", post(users::deactivate_user))
        .route("/users/{id}/chain", get(users::manager_chain))
        .route("/system/status", get(system::get_status))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(
            state,
            identity::identity_middleware,
        ))
}
