use axum::{
    extract::{Json, Path, Query, State},
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::common::{created_with_message, paginated_response, success_response, PaginationParams};
use crate::{
    auth::AuthUser, entities::OutwardType, errors::ApiError, services::outward::DispatchInput,
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct OutwardListQuery {
    pub outward_type: Option<OutwardType>,
}

/// Dispatch stock-ready devices under one outward number.
pub async fn dispatch(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<DispatchInput>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .outward
        .dispatch(payload, user.user_id)
        .await?;
    info!(
        outward_number = %detail.record.outward_number,
        units = detail.devices.len(),
        "outward dispatched"
    );
    let message = format!(
        "Dispatched {} device(s) under {}",
        detail.devices.len(),
        detail.record.outward_number
    );
    Ok(created_with_message(detail, message))
}

pub async fn list_outward(
    State(state): State<AppState>,
    Query(filter): Query<OutwardListQuery>,
    Query(paging): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = paging.resolve(&state.config);
    let (records, total) = state
        .services
        .outward
        .list(filter.outward_type, page, per_page)
        .await?;
    Ok(paginated_response(records, total, page, per_page))
}

pub async fn get_outward(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(state.services.outward.get(id).await?))
}

/// Printable gate pass for the dispatch.
pub async fn gate_pass(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, ApiError> {
    Ok(Html(state.services.exports.gate_pass_html(id).await?))
}

pub fn outward_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(dispatch).get(list_outward))
        .route("/{id}", get(get_outward))
        .route("/{id}/gate-pass", get(gate_pass))
}
