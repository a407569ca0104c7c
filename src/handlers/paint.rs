use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{paginated_response, success_response, PaginationParams};
use crate::{
    auth::AuthUser, entities::PaintPanelStatus, errors::ApiError, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct PaintQueueQuery {
    pub status: Option<PaintPanelStatus>,
}

/// Panels still in the paint shop unless a status is given.
pub async fn paint_queue(
    State(state): State<AppState>,
    Query(filter): Query<PaintQueueQuery>,
    Query(paging): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = paging.resolve(&state.config);
    let (panels, total) = state
        .services
        .paint
        .list_queue(filter.status, page, per_page)
        .await?;
    Ok(paginated_response(panels, total, page, per_page))
}

pub async fn start_panel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.paint.start_panel(id, user.user_id).await?,
    ))
}

pub async fn mark_ready(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.paint.mark_ready(id, user.user_id).await?,
    ))
}

/// Collect every finished panel of a device and hand it back to the floor.
pub async fn collect_device(
    State(state): State<AppState>,
    user: AuthUser,
    Path(device_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state
            .services
            .paint
            .collect_device_panels(device_id, user.user_id)
            .await?,
    ))
}

pub fn paint_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(paint_queue))
        .route("/panels/{id}/start", post(start_panel))
        .route("/panels/{id}/ready", post(mark_ready))
        .route("/devices/{device_id}/collect", post(collect_device))
}
