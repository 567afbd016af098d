use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiState;
use crate::entity::app_user::Role;
use crate::provisioning::Principal;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id (UUID, stored as string in JWT)
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    /// Unix timestamp expiry
    pub exp: u64,
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.sub,
            role: self.role,
        }
    }
}

pub fn encode_jwt(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

fn extract_bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

type Rejection = (StatusCode, &'static str);

fn authenticate(parts: &Parts, state: &ApiState) -> Result<Claims, Rejection> {
    let token = extract_bearer(parts).ok_or((
        StatusCode::UNAUTHORIZED,
        "Missing or invalid Authorization header",
    ))?;

    decode_jwt(token, &state.jwt_secret)
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))
}

/// Extractor: validates Bearer token (any authenticated user).
pub struct AuthClaims(pub Claims);

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
    ApiState: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = ApiState::from_ref(state);
        Ok(AuthClaims(authenticate(parts, &state)?))
    }
}

/// Extractor: validates Bearer token, requires role == agent.
pub struct AgentClaims(pub Claims);

impl<S> FromRequestParts<S> for AgentClaims
where
    S: Send + Sync,
    ApiState: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = ApiState::from_ref(state);
        let claims = authenticate(parts, &state)?;

        if claims.role != Role::Agent {
            return Err((StatusCode::FORBIDDEN, "Agent access required"));
        }

        Ok(AgentClaims(claims))
    }
}

/// Extractor: validates Bearer token, requires role == supervisor.
pub struct SupervisorClaims(pub Claims);

impl<S> FromRequestParts<S> for SupervisorClaims
where
    S: Send + Sync,
    ApiState: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = ApiState::from_ref(state);
        let claims = authenticate(parts, &state)?;

        if claims.role != Role::Supervisor {
            return Err((StatusCode::FORBIDDEN, "Supervisor access required"));
        }

        Ok(SupervisorClaims(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-jwt-secret-key-32-chars-pad";

    fn claims(role: Role, exp: u64) -> Claims {
        Claims {
            sub: Uuid::now_v7(),
            username: "acme".to_string(),
            role,
            exp,
        }
    }

    fn future() -> u64 {
        (chrono::Utc::now().timestamp() as u64) + 3600
    }

    #[test]
    fn round_trips_role_and_subject() {
        let original = claims(Role::Agent, future());
        let token = encode_jwt(&original, SECRET).unwrap();
        let decoded = decode_jwt(&token, SECRET).unwrap();

        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.role, Role::Agent);
        assert_eq!(decoded.principal().user_id, original.sub);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = encode_jwt(&claims(Role::Agent, future()), SECRET).unwrap();
        assert!(decode_jwt(&token, "another-secret-another-secret-xx").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = encode_jwt(&claims(Role::Supervisor, 1), SECRET).unwrap();
        assert!(decode_jwt(&token, SECRET).is_err());
    }
}
