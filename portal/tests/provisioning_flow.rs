//! End-to-end flow through the public router: agent login, provisioning,
//! and owner login with the one-time credentials.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use migration::{Migrator, MigratorTrait};
use portal::{
    api::{ApiState, api_router},
    auth::{Auth, NewUser},
    config::HashCost,
    entity::app_user::Role,
    provisioning::{ApartmentService, CredentialMinter},
};
use sea_orm::{Database, DatabaseConnection};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn setup() -> (DatabaseConnection, Router) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let auth = Arc::new(Auth::new(db.clone(), HashCost::default()));
    auth.create_user(NewUser {
        username: "acme".to_string(),
        password: "agent-pw".to_string(),
        name: "Acme Estates".to_string(),
        email: Some("Acme@Estates.test".to_string()),
        role: Role::Agent,
    })
    .await
    .unwrap();

    let state = ApiState {
        auth,
        apartments: ApartmentService::new(
            db.clone(),
            CredentialMinter::new(HashCost::default(), "owners.example"),
        ),
        db: db.clone(),
        jwt_secret: "integration-secret-integration-xx".to_string(),
        jwt_expiry_hours: 1,
    };
    let app = api_router(state, &["http://localhost:3000".to_string()]);
    (db, app)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header("Authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(json) => req
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await
}

#[tokio::test]
async fn health_is_public() {
    let (_db, app) = setup().await;
    let (status, _) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn provisioned_owner_can_log_in_with_issued_password() {
    let (_db, app) = setup().await;

    let (status, body) = login(&app, "acme", "agent-pw").await;
    assert_eq!(status, StatusCode::OK);
    let agent_token = body["token"].as_str().unwrap().to_string();

    let (status, created) = call(
        &app,
        "POST",
        "/api/v1/apartments",
        Some(&agent_token),
        Some(json!({
            "name": "Sunset Villa",
            "address": "1 Harbour Road",
            "type": "villa",
            "owners": [
                { "firstName": "Omar", "lastName": "Said" },
                { "firstName": "Lina", "lastName": "Haddad" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["apartment"]["code"], "AC100");
    let apartment_id = created["apartment"]["id"].as_str().unwrap().to_string();

    let lina = &created["owners"][1];
    assert_eq!(lina["email"], "lina.haddad.ac100.1@owners.example");
    let (status, body) = login(
        &app,
        lina["username"].as_str().unwrap(),
        lina["password"].as_str().unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "property_owner");
    let owner_token = body["token"].as_str().unwrap().to_string();

    let (status, me) = call(&app, "GET", "/api/v1/auth/me", Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["apartment_id"], apartment_id);

    // Owners are not agents.
    let (status, _) = call(&app, "GET", "/api/v1/apartments", Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn removed_owner_can_no_longer_log_in() {
    let (_db, app) = setup().await;
    let (_, body) = login(&app, "acme", "agent-pw").await;
    let agent_token = body["token"].as_str().unwrap().to_string();

    let (_, created) = call(
        &app,
        "POST",
        "/api/v1/apartments",
        Some(&agent_token),
        Some(json!({
            "name": "Harbour Loft",
            "owners": [{ "firstName": "Omar", "lastName": "Said" }]
        })),
    )
    .await;
    let apartment_id = created["apartment"]["id"].as_str().unwrap();
    let owner_id = created["apartment"]["owners"][0].as_str().unwrap();
    let username = created["owners"][0]["username"].as_str().unwrap();
    let password = created["owners"][0]["password"].as_str().unwrap();

    let (status, _) = call(
        &app,
        "DELETE",
        &format!("/api/v1/apartments/{apartment_id}/owners/{owner_id}"),
        Some(&agent_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = login(&app, username, password).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let (_db, app) = setup().await;
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.headers()["x-frame-options"], "DENY");
    assert_eq!(resp.headers()["cache-control"], "no-store");
}
