use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use sea_orm::EntityTrait;

use crate::auth::AuthApiError;
use crate::entity::app_user;

use super::{
    ApiErr, ApiState,
    dto::{LoginRequest, LoginResponse, UserResponse},
    jwt::{AuthClaims, Claims, encode_jwt},
};

pub async fn login(
    State(state): State<ApiState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiErr> {
    let user = state
        .auth
        .authenticate_for_api(&body.username, &body.password)
        .await
        .map_err(|e| match e {
            AuthApiError::Db(db) => {
                tracing::error!(error = %db, "login lookup failed");
                ApiErr::new(StatusCode::SERVICE_UNAVAILABLE, "Store unavailable, retry later")
            }
            _ => ApiErr::new(StatusCode::UNAUTHORIZED, "Invalid credentials"),
        })?;

    let exp = (Utc::now().timestamp() as u64) + state.jwt_expiry_hours * 3600;
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        exp,
    };

    let token = encode_jwt(&claims, &state.jwt_secret).map_err(ApiErr::internal)?;
    tracing::info!(username = %user.username, role = user.role.as_str(), "login");

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

pub async fn me(
    AuthClaims(claims): AuthClaims,
    State(state): State<ApiState>,
) -> Result<Json<UserResponse>, ApiErr> {
    let user = app_user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await
        .map_err(ApiErr::internal)?
        .ok_or_else(|| ApiErr::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::test_support::{router, send, token_for};
    use crate::entity::app_user::Role;
    use crate::provisioning::test_support::{agent_ac, create_user, setup_db};

    #[tokio::test]
    async fn login_returns_token_usable_for_me() {
        let db = setup_db().await;
        agent_ac(&db).await;

        let (status, body) = send(
            router(&db),
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "acme", "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "agent");
        assert!(body["user"].get("password_hash").is_none());
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(router(&db), "GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "acme");
        assert!(!body["last_login_at"].is_null());
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let db = setup_db().await;
        agent_ac(&db).await;

        let (status, body) = send(
            router(&db),
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "acme", "password": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn me_requires_bearer_token() {
        let db = setup_db().await;
        let supervisor = create_user(&db, "sup", Role::Supervisor, None).await;

        let (status, _) = send(router(&db), "GET", "/api/v1/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = token_for(&supervisor);
        let (status, body) = send(router(&db), "GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "supervisor");
    }
}
