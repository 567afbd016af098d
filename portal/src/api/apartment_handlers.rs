use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use super::{
    ApiErr, ApiState,
    dto::{
        ApartmentDetailResponse, ApartmentResponse, EditApartmentRequest, ListApartmentsQuery,
        PaginatedResponse, ProvisionApartmentRequest, ProvisionApartmentResponse,
    },
    jwt::AgentClaims,
};

pub async fn list_apartments(
    AgentClaims(claims): AgentClaims,
    State(state): State<ApiState>,
    Query(params): Query<ListApartmentsQuery>,
) -> Result<Json<PaginatedResponse<ApartmentResponse>>, ApiErr> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);

    let (records, total) = state
        .apartments
        .list_apartments(
            &claims.principal(),
            page,
            page_size,
            params.search.as_deref(),
        )
        .await?;

    Ok(Json(PaginatedResponse {
        data: records.into_iter().map(ApartmentResponse::from).collect(),
        total,
        page,
        page_size,
    }))
}

/// `POST /apartments`. The response is the only place owner passwords appear.
pub async fn provision_apartment(
    AgentClaims(claims): AgentClaims,
    State(state): State<ApiState>,
    Json(body): Json<ProvisionApartmentRequest>,
) -> Result<(StatusCode, Json<ProvisionApartmentResponse>), ApiErr> {
    let (descriptor, owners) = body.into_parts();
    let provisioned = state
        .apartments
        .provision_apartment(&claims.principal(), descriptor, owners)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProvisionApartmentResponse::from(provisioned)),
    ))
}

pub async fn get_apartment(
    AgentClaims(claims): AgentClaims,
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApartmentDetailResponse>, ApiErr> {
    let detail = state
        .apartments
        .get_apartment(&claims.principal(), id)
        .await?;
    Ok(Json(ApartmentDetailResponse::from(detail)))
}

pub async fn edit_apartment(
    AgentClaims(claims): AgentClaims,
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(body): Json<EditApartmentRequest>,
) -> Result<Json<ApartmentResponse>, ApiErr> {
    let record = state
        .apartments
        .edit_apartment(&claims.principal(), id, &body.name)
        .await?;
    Ok(Json(ApartmentResponse::from(record)))
}

pub async fn delete_apartment(
    AgentClaims(claims): AgentClaims,
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiErr> {
    state
        .apartments
        .delete_apartment(&claims.principal(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_resident(
    AgentClaims(claims): AgentClaims,
    State(state): State<ApiState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApartmentResponse>, ApiErr> {
    let record = state
        .apartments
        .add_resident(&claims.principal(), id, user_id)
        .await?;
    Ok(Json(ApartmentResponse::from(record)))
}

pub async fn remove_resident(
    AgentClaims(claims): AgentClaims,
    State(state): State<ApiState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApartmentResponse>, ApiErr> {
    let record = state
        .apartments
        .remove_resident(&claims.principal(), id, user_id)
        .await?;
    Ok(Json(ApartmentResponse::from(record)))
}

pub async fn remove_owner(
    AgentClaims(claims): AgentClaims,
    State(state): State<ApiState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApartmentResponse>, ApiErr> {
    let record = state
        .apartments
        .remove_owner(&claims.principal(), id, user_id)
        .await?;
    Ok(Json(ApartmentResponse::from(record)))
}
