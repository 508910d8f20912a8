use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::tenants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, TenantChanges};

use super::{
    ApiErr, AppState,
    dto::{
        CreateTenantRequest, IdentifierExistsResponse, ListTenantsQuery, PaginatedResponse,
        TenantResponse, UpdateTenantRequest,
    },
    jwt::AuthClaims,
};

pub async fn list_tenants(
    AuthClaims(_): AuthClaims,
    State(state): State<AppState>,
    Query(params): Query<ListTenantsQuery>,
) -> Result<Json<PaginatedResponse<TenantResponse>>, ApiErr> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let (items, total) = state.tenants.list_paged(page, page_size).await?;

    Ok(Json(PaginatedResponse {
        data: items.into_iter().map(TenantResponse::from).collect(),
        total,
        page,
        page_size,
    }))
}

pub async fn create_tenant(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
    Json(body): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<TenantResponse>), ApiErr> {
    let created = state
        .tenants
        .create(&claims.scope(), &body.name, &body.identifier)
        .await?;

    Ok((StatusCode::CREATED, Json(TenantResponse::from(created))))
}

pub async fn get_tenant(
    AuthClaims(_): AuthClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TenantResponse>, ApiErr> {
    let found = state.tenants.get(id).await?;
    Ok(Json(TenantResponse::from(found)))
}

pub async fn update_tenant(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTenantRequest>,
) -> Result<Json<TenantResponse>, ApiErr> {
    let updated = state
        .tenants
        .update(
            &claims.scope(),
            id,
            TenantChanges {
                name: body.name,
                is_active: body.is_active,
                subscription_ends_at: body.subscription_ends_at,
            },
        )
        .await?;

    Ok(Json(TenantResponse::from(updated)))
}

pub async fn delete_tenant(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiErr> {
    state.tenants.delete(&claims.scope(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn identifier_exists(
    AuthClaims(_): AuthClaims,
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<IdentifierExistsResponse>, ApiErr> {
    let exists = state.tenants.identifier_exists(&identifier).await?;
    Ok(Json(IdentifierExistsResponse { exists }))
}
