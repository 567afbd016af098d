use axum::{extract::State, response::Json};

use super::{ApiErr, ApiState, dto::AgentResponse, jwt::SupervisorClaims};

pub async fn list_agents(
    SupervisorClaims(_): SupervisorClaims,
    State(state): State<ApiState>,
) -> Result<Json<Vec<AgentResponse>>, ApiErr> {
    let agents = state.apartments.list_agents().await?;
    Ok(Json(agents.into_iter().map(AgentResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::test_support::{router, send, token_for};
    use crate::entity::app_user::Role;
    use crate::provisioning::test_support::{agent_ac, create_user, setup_db};

    #[tokio::test]
    async fn supervisor_sees_agents_with_counts() {
        let db = setup_db().await;
        let acme = agent_ac(&db).await;
        let supervisor = create_user(&db, "sup", Role::Supervisor, None).await;

        send(
            router(&db),
            "POST",
            "/api/v1/apartments",
            Some(&token_for(&acme)),
            Some(json!({ "name": "Sunset Villa" })),
        )
        .await;

        let (status, body) = send(
            router(&db),
            "GET",
            "/api/v1/agents",
            Some(&token_for(&supervisor)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["prefix"], "AC");
        assert_eq!(body[0]["apartment_count"], 1);
        assert_eq!(body[0]["last_issued_code"], "AC100");
    }

    #[tokio::test]
    async fn agents_cannot_list_agents() {
        let db = setup_db().await;
        let acme = agent_ac(&db).await;

        let (status, _) = send(
            router(&db),
            "GET",
            "/api/v1/agents",
            Some(&token_for(&acme)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
