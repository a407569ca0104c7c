use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{created_response, paginated_response, success_response, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::InwardType,
    errors::ApiError,
    services::inward::{AddDevicesInput, CreateBatchInput},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct BatchListQuery {
    pub inward_type: Option<InwardType>,
}

/// Receive a batch of devices (purchase, rental return or other).
pub async fn create_batch(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateBatchInput>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = state
        .services
        .inward
        .create_batch(payload, user.user_id)
        .await?;
    Ok(created_response(batch))
}

pub async fn list_batches(
    State(state): State<AppState>,
    Query(filter): Query<BatchListQuery>,
    Query(paging): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = paging.resolve(&state.config);
    let (batches, total) = state
        .services
        .inward
        .list_batches(filter.inward_type, page, per_page)
        .await?;
    Ok(paginated_response(batches, total, page, per_page))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.inward.get_batch(id).await?))
}

pub async fn add_devices(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddDevicesInput>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = state
        .services
        .inward
        .add_devices_to_batch(id, payload, user.user_id)
        .await?;
    Ok(created_response(batch))
}

pub fn inward_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_batch).get(list_batches))
        .route("/{id}", get(get_batch))
        .route("/{id}/devices", post(add_devices))
}
