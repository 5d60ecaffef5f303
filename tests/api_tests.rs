//! HTTP-level tests: identity enforcement, status codes for the error
//! taxonomy, and a full lead workflow through the router.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use plomo::Config;
use tower::ServiceExt;

/// Bootstrap admin seeded by the initial migration.
const ADMIN_ID: &str = "1";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.scheduler.enabled = false;

    let state = plomo::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    plomo::api::router(state).await
}

fn get(uri: &str, caller: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(id) = caller {
        builder = builder.header("X-Caller-Id", id);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, caller: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-Caller-Id", caller)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_user(app: &Router, name: &str, role: &str, reports_to: Option<i64>) -> i64 {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            ADMIN_ID,
            serde_json::json!({
                "name": name,
                "email": format!("{name}@concesionaria.local"),
                "role": role,
                "reports_to": reports_to,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn requests_require_a_resolvable_caller() {
    let app = spawn_app().await;

    let response = app.clone().oneshot(get("/api/leads", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/api/leads", Some("9999")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/api/leads", Some("not-a-number")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/api/leads", Some(ADMIN_ID)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn system_status_reports_database_health() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/system/status", Some(ADMIN_ID)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["database_ok"], true);
    assert!(body["data"]["version"].is_string());
}

#[tokio::test]
async fn lead_workflow_over_http() {
    let app = spawn_app().await;

    let gerente = create_user(&app, "gerente", "manager", None).await;
    let vendedor = create_user(&app, "vendedor", "vendedor", Some(gerente)).await;
    let otro = create_user(&app, "otro", "vendedor", Some(gerente)).await;

    // Create a lead assigned to vendedor.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/leads",
            ADMIN_ID,
            serde_json::json!({
                "nombre": "Carlos Pérez",
                "telefono": "555-0101",
                "modelo": "Corolla XEI",
                "vendedor": vendedor,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let lead = json_body(response).await["data"]["id"].as_i64().unwrap();

    // The assignee sees it; a peer does not.
    let body = json_body(
        app.clone()
            .oneshot(get("/api/leads", Some(&vendedor.to_string())))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let body = json_body(
        app.clone()
            .oneshot(get("/api/leads", Some(&otro.to_string())))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // A peer reading the lead directly is forbidden.
    let response = app
        .clone()
        .oneshot(get(&format!("/api/leads/{lead}"), Some(&otro.to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Legal transition by the assignee.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/leads/{lead}/transition"),
            &vendedor.to_string(),
            serde_json::json!({"from": "nuevo", "to": "contactado"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["estado"], "contactado");

    // Replaying the stale expectation conflicts.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/leads/{lead}/transition"),
            &vendedor.to_string(),
            serde_json::json!({"from": "nuevo", "to": "contactado"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Skipping stages is unprocessable.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/leads/{lead}/transition"),
            &vendedor.to_string(),
            serde_json::json!({"from": "contactado", "to": "negociacion"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // A vendor reassigning to a peer is forbidden; the manager may.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/leads/{lead}/assign"),
            &vendedor.to_string(),
            serde_json::json!({"target_user_id": otro}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/leads/{lead}/assign"),
            &gerente.to_string(),
            serde_json::json!({"target_user_id": otro}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["vendedor"], otro);
    assert_eq!(body["data"]["estado"], "contactado");

    // The audit trail now holds both assignments.
    let body = json_body(
        app.clone()
            .oneshot(get(
                &format!("/api/leads/{lead}/assignments"),
                Some(ADMIN_ID),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn quote_attachment_over_http() {
    let app = spawn_app().await;

    let gerente = create_user(&app, "gerente", "manager", None).await;
    let vendedor = create_user(&app, "vendedor", "vendedor", Some(gerente)).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/leads",
            ADMIN_ID,
            serde_json::json!({
                "nombre": "Lucía Gómez",
                "telefono": "555-0202",
                "modelo": "Hilux SRX",
                "vendedor": vendedor,
            }),
        ))
        .await
        .unwrap();
    let lead = json_body(response).await["data"]["id"].as_i64().unwrap();

    // Quote precondition: presupuestado is blocked until a quote is active.
    for (from, to) in [("nuevo", "contactado"), ("contactado", "calificado")] {
        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/leads/{lead}/transition"),
                ADMIN_ID,
                serde_json::json!({"from": from, "to": to}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/leads/{lead}/transition"),
            ADMIN_ID,
            serde_json::json!({"from": "calificado", "to": "presupuestado"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);

    // Create two quotes; attaching the second supersedes the first.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/presupuestos",
            ADMIN_ID,
            serde_json::json!({"contenido": {"total": 25000}, "lead_id": lead}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let q1 = json_body(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/presupuestos",
            ADMIN_ID,
            serde_json::json!({"contenido": {"total": 24000}}),
        ))
        .await
        .unwrap();
    let q2 = json_body(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/leads/{lead}/presupuesto"),
            ADMIN_ID,
            serde_json::json!({"presupuesto_id": q2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(
        app.clone()
            .oneshot(get(&format!("/api/presupuestos/{q1}"), Some(ADMIN_ID)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["data"]["activo"], false);

    let body = json_body(
        app.clone()
            .oneshot(get(&format!("/api/presupuestos/{q2}"), Some(ADMIN_ID)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["data"]["activo"], true);

    // With an active quote the transition goes through.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/leads/{lead}/transition"),
            ADMIN_ID,
            serde_json::json!({"from": "calificado", "to": "presupuestado"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Attaching to an unknown lead is a 404.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/leads/99999/presupuesto",
            ADMIN_ID,
            serde_json::json!({"presupuesto_id": q1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_validation_errors_map_to_http_statuses() {
    let app = spawn_app().await;

    let gerente = create_user(&app, "gerente", "manager", None).await;
    let vendedor = create_user(&app, "vendedor", "vendedor", Some(gerente)).await;

    // Duplicate email conflicts.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            ADMIN_ID,
            serde_json::json!({
                "name": "gerente",
                "email": "gerente@concesionaria.local",
                "role": "manager",
                "reports_to": null,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Dangling reports_to is a validation error.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            ADMIN_ID,
            serde_json::json!({
                "name": "huerfano",
                "email": "huerfano@concesionaria.local",
                "role": "vendedor",
                "reports_to": 4242,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A vendor may not create users.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            &vendedor.to_string(),
            serde_json::json!({
                "name": "intruso",
                "email": "intruso@concesionaria.local",
                "role": "vendedor",
                "reports_to": null,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
