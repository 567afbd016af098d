use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePath;
use tower_http::set_header::response::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::Auth;
use crate::provisioning::{ApartmentService, ProvisionError};

pub mod agent_handlers;
pub mod apartment_handlers;
pub mod auth_handlers;
pub mod dto;
pub mod jwt;

// ---------- shared state ----------

#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<Auth>,
    pub apartments: ApartmentService,
    pub db: DatabaseConnection,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

// ---------- error type ----------

/// A JSON error response: `{"error": "..."}` with an HTTP status.
#[derive(Debug)]
pub struct ApiErr(StatusCode, String);

impl ApiErr {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(status, msg.into())
    }

    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(StatusCode::NOT_FOUND, msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self(StatusCode::CONFLICT, msg.into())
    }
}

impl From<ProvisionError> for ApiErr {
    fn from(e: ProvisionError) -> Self {
        match e {
            ProvisionError::NotFound { .. } => Self::not_found(e.to_string()),
            ProvisionError::Validation { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            ProvisionError::OwnerConflict { .. } | ProvisionError::CodeConflict { .. } => {
                Self::conflict(e.to_string())
            }
            ProvisionError::Forbidden => Self::new(StatusCode::FORBIDDEN, e.to_string()),
            ProvisionError::Dependency(ref db) => {
                tracing::error!(error = %db, "store failure");
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Store unavailable, retry later")
            }
            ProvisionError::Hash(ref reason) => {
                tracing::error!(%reason, "password hashing failed");
                Self::internal("Credential generation failed")
            }
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.1 });
        (self.0, Json(body)).into_response()
    }
}

// ---------- router ----------

pub fn api_router(state: ApiState, cors_origins: &[String]) -> Router {
    let allowed_origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new() // no origins allowed = same-origin only
    } else {
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
    };

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .nest("/api/v1", api_v1())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        // Responses carrying one-time owner passwords must never be cached.
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

/// The served application: [`api_router`] behind trailing-slash
/// normalisation. The path is rewritten before routing, so this has to wrap
/// the router rather than be one of its layers.
pub fn portal_service(state: ApiState, cors_origins: &[String]) -> NormalizePath<Router> {
    NormalizePath::trim_trailing_slash(api_router(state, cors_origins))
}

fn api_v1() -> Router<ApiState> {
    Router::new()
        // auth
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/me", get(auth_handlers::me))
        // apartments
        .route(
            "/apartments",
            get(apartment_handlers::list_apartments).post(apartment_handlers::provision_apartment),
        )
        .route(
            "/apartments/{id}",
            get(apartment_handlers::get_apartment)
                .put(apartment_handlers::edit_apartment)
                .delete(apartment_handlers::delete_apartment),
        )
        .route(
            "/apartments/{id}/residents/{user_id}",
            put(apartment_handlers::add_resident).delete(apartment_handlers::remove_resident),
        )
        .route(
            "/apartments/{id}/owners/{user_id}",
            delete(apartment_handlers::remove_owner),
        )
        // supervisor
        .route("/agents", get(agent_handlers::list_agents))
}


#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::test_support::{router, state, token_for};
    use super::*;
    use crate::provisioning::test_support::{agent_ac, setup_db};

    fn get(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn trailing_slash_is_trimmed_before_routing() {
        let db = setup_db().await;
        let token = token_for(&agent_ac(&db).await);

        for uri in ["/health/", "/api/v1/apartments/"] {
            let resp = portal_service(state(&db), &[])
                .oneshot(get(uri, &token))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn bare_router_does_not_match_trailing_slash() {
        let db = setup_db().await;
        let token = token_for(&agent_ac(&db).await);

        let resp = router(&db)
            .oneshot(get("/api/v1/apartments/", &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
