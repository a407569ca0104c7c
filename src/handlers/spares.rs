use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::common::{created_response, paginated_response, success_response, PaginationParams};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::spares::{
        AdjustStockInput, CreateSparePartInput, ReceiveStockInput, SparePartFilter,
        UpdateSparePartInput,
    },
    AppState,
};

pub async fn create_part(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSparePartInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(created_response(
        state.services.spares.create_part(payload, user.user_id).await?,
    ))
}

pub async fn list_parts(
    State(state): State<AppState>,
    Query(filter): Query<SparePartFilter>,
    Query(paging): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = paging.resolve(&state.config);
    let (parts, total) = state
        .services
        .spares
        .list_parts(filter, page, per_page)
        .await?;
    Ok(paginated_response(parts, total, page, per_page))
}

pub async fn get_part(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.spares.get_part(id).await?))
}

pub async fn update_part(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSparePartInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.spares.update_part(id, payload).await?,
    ))
}

pub async fn receive_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReceiveStockInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .spares
            .receive_stock(id, payload, user.user_id)
            .await?,
    ))
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustStockInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .spares
            .adjust_stock(id, payload, user.user_id)
            .await?,
    ))
}

/// Parts at or below their minimum stock level.
pub async fn low_stock(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.spares.low_stock().await?))
}

pub async fn part_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(paging): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = paging.resolve(&state.config);
    let (rows, total) = state
        .services
        .spares
        .transactions(id, page, per_page)
        .await?;
    Ok(paginated_response(rows, total, page, per_page))
}

pub fn spares_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_part).get(list_parts))
        .route("/low-stock", get(low_stock))
        .route("/{id}", get(get_part).put(update_part))
        .route("/{id}/receive", post(receive_stock))
        .route("/{id}/adjust", post(adjust_stock))
        .route("/{id}/transactions", get(part_transactions))
}
